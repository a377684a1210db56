use std::time::Duration;
use std::{fmt, sync::Arc};

use tokio::sync::Notify;
use tokio::time::timeout;

/// Default timeout for notifications.
///
/// Tests run with a paused clock, so this is virtual time and only elapses once every task is
/// idle, which means the awaited condition cannot be reached anymore.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(600);

/// A wrapper around [`Arc<Notify>`] that fails the test instead of hanging forever.
#[derive(Clone)]
pub struct TimedNotify {
    notify: Arc<Notify>,
    timeout_duration: Duration,
}

impl TimedNotify {
    pub fn new(notify: Arc<Notify>) -> Self {
        Self {
            notify,
            timeout_duration: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Waits for a notification with timeout.
    ///
    /// # Panics
    ///
    /// Panics if the timeout elapses before the notification is received.
    pub async fn notified(&self) {
        if timeout(self.timeout_duration, self.notify.notified())
            .await
            .is_err()
        {
            panic!(
                "Test notification timed out after {:?}. \
                 This likely indicates the expected condition was never reached.",
                self.timeout_duration
            );
        }
    }
}

impl fmt::Debug for TimedNotify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimedNotify")
            .field("timeout_duration", &self.timeout_duration)
            .finish()
    }
}
