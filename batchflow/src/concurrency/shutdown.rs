use tokio::sync::watch;

/// Transmitter side of the shutdown coordination channel.
///
/// [`ShutdownTx`] is held by the pipeline and notifies the flush worker that it should stop at
/// its next suspension point. The signal carries no payload, a change of the watched value is
/// the notification.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Wraps a watch sender into a [`ShutdownTx`].
    pub fn new(tx: watch::Sender<()>) -> Self {
        Self(tx)
    }

    /// Sends the shutdown signal to every subscribed receiver.
    ///
    /// Fails when no receiver is subscribed, meaning there is nothing left to shut down.
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new shutdown receiver subscription.
    ///
    /// The receiver only observes signals sent after the subscription.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the shutdown coordination channel.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown coordination channel.
///
/// The initial receiver is returned for convenience and can be dropped, callers usually
/// subscribe through [`ShutdownTx::subscribe`] when starting a worker.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx::new(tx), rx)
}

/// Returns whether a shutdown was signaled on `shutdown_rx` since it was last marked seen.
///
/// A dropped transmitter counts as a shutdown, since nobody can control the worker anymore.
pub fn is_shutdown_requested(shutdown_rx: &ShutdownRx) -> bool {
    shutdown_rx.has_changed().unwrap_or(true)
}
