use std::slice;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::data_model::BatchResult;
use crate::error::{AnalyticsError, Result};
use crate::invoker::{BatchInvoker, TaskPayload};
use crate::utils::prometheus_metrics::{
    ACTIVE_UNITS, UNITS_COMPLETED_TOTAL, UNIT_DURATION_SECONDS, UNIT_TIMEOUTS_TOTAL,
};

/// Ordered, bounded-concurrency map over an iterator of rows.
///
/// Every row becomes one unit of work: extract (text, language hint), invoke
/// the remote task with a singleton batch, attach the result to the row. At
/// most `concurrency` units hold a slot at any time, each unit must finish
/// within `timeout`, and rows come back in input order no matter in which
/// order the remote answers.
///
/// The semaphore gate lives on the processor, so several processing calls on
/// one instance share a single concurrency budget against the same remote
/// service.
pub struct ConcurrentRowProcessor {
    concurrency: usize,
    timeout: Duration,
    gate: Arc<Semaphore>,
}

impl ConcurrentRowProcessor {
    pub fn new(concurrency: usize, timeout: Duration) -> Result<Self> {
        if concurrency < 1 {
            return Err(AnalyticsError::ConfigValidationError(
                "ConcurrentRowProcessor: concurrency must be at least 1".to_string(),
            ));
        }
        if timeout.is_zero() {
            return Err(AnalyticsError::ConfigValidationError(
                "ConcurrentRowProcessor: timeout must be positive".to_string(),
            ));
        }
        Ok(ConcurrentRowProcessor {
            concurrency,
            timeout,
            gate: Arc::new(Semaphore::new(concurrency)),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Lazily annotates `rows`, yielding each row in input order with the
    /// invocation result attached. The input iterator is consumed
    /// incrementally; at most `concurrency` rows are pulled ahead of the
    /// consumer. Any yielded error is fatal for the call, the caller is
    /// expected to stop consuming (see [`Self::run_to_vec`]). Dropping the
    /// stream aborts the units still in flight; their slots return to the
    /// budget once the aborted work has stopped.
    pub fn run<R, I, T, F, G>(
        &self,
        rows: I,
        invoker: Arc<BatchInvoker<T>>,
        extract: F,
        attach: G,
    ) -> impl Stream<Item = Result<R>>
    where
        R: Send + 'static,
        I: IntoIterator<Item = R>,
        T: TaskPayload + 'static,
        F: Fn(&R) -> (String, String) + Send + Sync + 'static,
        G: Fn(R, BatchResult<T>) -> Result<R> + Send + Sync + 'static,
    {
        let timeout = self.timeout;
        let gate = Arc::clone(&self.gate);
        let extract = Arc::new(extract);
        let attach = Arc::new(attach);

        stream::iter(rows.into_iter().map(move |row| {
            Self::run_unit(
                row,
                Arc::clone(&invoker),
                Arc::clone(&extract),
                Arc::clone(&attach),
                Arc::clone(&gate),
                timeout,
            )
        }))
        .buffered(self.concurrency)
    }

    /// Eager form of [`Self::run`]: collects every annotated row, failing
    /// fast on the first erroneous unit. On failure no rows are returned,
    /// not even the ones that completed before the error.
    #[instrument(skip_all, fields(concurrency = self.concurrency, timeout_ms = self.timeout.as_millis() as u64))]
    pub async fn run_to_vec<R, I, T, F, G>(
        &self,
        rows: I,
        invoker: Arc<BatchInvoker<T>>,
        extract: F,
        attach: G,
    ) -> Result<Vec<R>>
    where
        R: Send + 'static,
        I: IntoIterator<Item = R>,
        T: TaskPayload + 'static,
        F: Fn(&R) -> (String, String) + Send + Sync + 'static,
        G: Fn(R, BatchResult<T>) -> Result<R> + Send + Sync + 'static,
    {
        let rows = self
            .run(rows, invoker, extract, attach)
            .try_collect::<Vec<R>>()
            .await?;
        debug!(rows = rows.len(), "Processed row stream to completion");
        Ok(rows)
    }

    /// One unit of work: wait for a slot, run extract → invoke → attach as
    /// its own task on the runtime, enforce the deadline. The deadline
    /// covers the unit's execution, not the wait for a slot; a unit stuck
    /// behind a full gate is not "slow", the remote call it makes is.
    ///
    /// The spawned task carries its own slot and a [`UnitGuard`] carries the
    /// task, so abandoning this future mid-flight aborts the task, rolls the
    /// gauge back, and frees the slot only once the task has stopped.
    async fn run_unit<R, T, F, G>(
        row: R,
        invoker: Arc<BatchInvoker<T>>,
        extract: Arc<F>,
        attach: Arc<G>,
        gate: Arc<Semaphore>,
        timeout: Duration,
    ) -> Result<R>
    where
        R: Send + 'static,
        T: TaskPayload + 'static,
        F: Fn(&R) -> (String, String) + Send + Sync + 'static,
        G: Fn(R, BatchResult<T>) -> Result<R> + Send + Sync + 'static,
    {
        let permit = gate
            .acquire_owned()
            .await
            .map_err(|_| AnalyticsError::Unexpected("concurrency gate closed".to_string()))?;

        let timer = UNIT_DURATION_SECONDS.start_timer();
        let mut unit = UnitGuard::supervise(tokio::spawn(async move {
            // The slot frees when this task finishes or its cancellation
            // completes, never earlier.
            let _slot = permit;
            let (text, hint) = extract(&row);
            let batch = invoker
                .invoke(slice::from_ref(&text), slice::from_ref(&hint))
                .await?;
            attach(row, batch)
        }));

        let outcome = match tokio::time::timeout(timeout, &mut unit.handle).await {
            Ok(Ok(unit_result)) => unit_result,
            Ok(Err(join_err)) => Err(AnalyticsError::Unexpected(format!(
                "Unit of work aborted unexpectedly: {}",
                join_err
            ))),
            Err(_) => {
                UNIT_TIMEOUTS_TOTAL.inc();
                Err(AnalyticsError::Timeout { limit: timeout })
            }
        };

        timer.observe_duration();
        if outcome.is_ok() {
            UNITS_COMPLETED_TOTAL.inc();
        }
        outcome
    }
}

/// Supervision handle for one spawned unit. Dropping it aborts the task
/// (a no-op once the task has finished) and rolls back the active-units
/// gauge, so a consumer that stops polling the row stream leaves no unit
/// running and no gauge drift behind.
struct UnitGuard<O> {
    handle: JoinHandle<O>,
}

impl<O> UnitGuard<O> {
    fn supervise(handle: JoinHandle<O>) -> Self {
        ACTIVE_UNITS.inc();
        UnitGuard { handle }
    }
}

impl<O> Drop for UnitGuard<O> {
    fn drop(&mut self) {
        self.handle.abort();
        ACTIVE_UNITS.dec();
    }
}
