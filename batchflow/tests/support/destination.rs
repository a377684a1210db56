use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use batchflow::destination::Destination;
use batchflow::error::{ErrorKind, FlowError, FlowResult};
use batchflow::types::Record;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::support::notify::TimedNotify;

type Condition = Box<dyn Fn(&SendLog) -> bool + Send + Sync>;

/// One call to [`Destination::send`] observed by the wrapper.
#[derive(Debug, Clone)]
pub struct SendAttempt {
    pub record_ids: Vec<u64>,
    pub at: Instant,
    pub succeeded: bool,
}

/// Everything the wrapper observed so far.
#[derive(Debug, Default, Clone)]
pub struct SendLog {
    pub attempts: Vec<SendAttempt>,
    pub delivered_records: usize,
}

struct Inner<D> {
    wrapped_destination: D,
    failure_plan: VecDeque<Option<ErrorKind>>,
    shutdown_failure: Option<ErrorKind>,
    log: SendLog,
    conditions: Vec<(Condition, Arc<Notify>)>,
}

impl<D> Inner<D> {
    fn check_conditions(&mut self) {
        let log = &self.log;
        self.conditions.retain(|(condition, notify)| {
            let should_retain = !condition(log);
            if !should_retain {
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// Test wrapper for [`Destination`] implementations that records every send and can inject
/// failures.
///
/// Sends consume the failure plan in order: a planned [`ErrorKind`] makes that send fail without
/// reaching the wrapped destination, a `None` entry or an empty plan forwards the batch.
#[derive(Clone)]
pub struct TestDestinationWrapper<D> {
    inner: Arc<Mutex<Inner<D>>>,
}

impl<D> fmt::Debug for TestDestinationWrapper<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDestinationWrapper").finish()
    }
}

impl<D> TestDestinationWrapper<D> {
    pub fn wrap(destination: D) -> Self {
        let inner = Inner {
            wrapped_destination: destination,
            failure_plan: VecDeque::new(),
            shutdown_failure: None,
            log: SendLog::default(),
            conditions: Vec::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Makes the next sends fail with the given kinds, `None` letting one send through.
    pub async fn plan_failures(&self, plan: impl IntoIterator<Item = Option<ErrorKind>>) {
        self.inner.lock().await.failure_plan.extend(plan);
    }

    /// Makes every send fail with `kind`, up to `count` sends.
    pub async fn fail_next_sends(&self, kind: ErrorKind, count: usize) {
        self.plan_failures(std::iter::repeat_n(Some(kind), count))
            .await;
    }

    /// Makes [`Destination::shutdown`] fail with `kind` instead of reaching the wrapped
    /// destination.
    pub async fn fail_shutdown(&self, kind: ErrorKind) {
        self.inner.lock().await.shutdown_failure = Some(kind);
    }

    pub async fn attempts(&self) -> Vec<SendAttempt> {
        self.inner.lock().await.log.attempts.clone()
    }

    pub async fn delivered_records(&self) -> usize {
        self.inner.lock().await.log.delivered_records
    }

    /// Registers a notification that fires once `condition` holds for the send log.
    pub async fn notify_on<F>(&self, condition: F) -> TimedNotify
    where
        F: Fn(&SendLog) -> bool + Send + Sync + 'static,
    {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.lock().await;
        inner.conditions.push((Box::new(condition), notify.clone()));

        // Check conditions immediately in case they're already satisfied.
        inner.check_conditions();

        TimedNotify::new(notify)
    }

    pub async fn wait_for_delivered_records(&self, count: usize) -> TimedNotify {
        self.notify_on(move |log| log.delivered_records >= count)
            .await
    }

    pub async fn wait_for_attempts(&self, count: usize) -> TimedNotify {
        self.notify_on(move |log| log.attempts.len() >= count).await
    }
}

impl<D> Destination for TestDestinationWrapper<D>
where
    D: Destination + Send + Sync,
{
    fn name() -> &'static str {
        "test_wrapper"
    }

    async fn shutdown(&self) -> FlowResult<()> {
        let inner = self.inner.lock().await;

        if let Some(kind) = inner.shutdown_failure {
            return Err(FlowError::from((kind, "Injected shutdown failure")));
        }

        inner.wrapped_destination.shutdown().await
    }

    async fn send(&self, batch: &[Record]) -> FlowResult<()> {
        let mut inner = self.inner.lock().await;

        let planned_failure = inner.failure_plan.pop_front().flatten();
        let result = match planned_failure {
            Some(kind) => Err(FlowError::from((
                kind,
                "Injected send failure",
                format!("The test wrapper failed a batch of {} records", batch.len()),
            ))),
            None => inner.wrapped_destination.send(batch).await,
        };

        let succeeded = result.is_ok();
        inner.log.attempts.push(SendAttempt {
            record_ids: batch.iter().map(|record| record.id().into_inner()).collect(),
            at: Instant::now(),
            succeeded,
        });
        if succeeded {
            inner.log.delivered_records += batch.len();
        }

        inner.check_conditions();

        result
    }
}
