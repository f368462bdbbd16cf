use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::signal::StopToken;
use crate::error::{SchedulerError, WorkError};

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Outcome of one invocation of a recurring work unit.
pub type WorkResult = Result<(), WorkError>;

type BlockingFn = dyn Fn(&StopToken) -> WorkResult + Send + Sync + 'static;
type SuspendingFn = dyn Fn(StopToken) -> BoxFuture<WorkResult> + Send + Sync + 'static;

// ============================================================================
// RECURRING WORK UNIT
// ============================================================================

/// Work invoked by the scheduler loop once per interval.
///
/// The variant is fixed when the unit is built, so the loop never has to
/// inspect the callable again.
#[derive(Clone)]
pub enum WorkUnit {
    /// Runs on the context's blocking pool; free to block the thread.
    Blocking(Arc<BlockingFn>),
    /// Runs as a task on the context's cooperative runtime; must not block.
    Suspending(Arc<SuspendingFn>),
}

impl WorkUnit {
    pub fn blocking<F>(work: F) -> Self
    where
        F: Fn(&StopToken) -> WorkResult + Send + Sync + 'static,
    {
        WorkUnit::Blocking(Arc::new(work))
    }

    pub fn suspending<F, Fut>(work: F) -> Self
    where
        F: Fn(StopToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = WorkResult> + Send + 'static,
    {
        WorkUnit::Suspending(Arc::new(move |token: StopToken| -> BoxFuture<WorkResult> {
            Box::pin(work(token))
        }))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WorkUnit::Blocking(_) => "blocking",
            WorkUnit::Suspending(_) => "suspending",
        }
    }

    /// Run the unit once. Errors and panics come back as values.
    pub(crate) async fn invoke(&self, token: &StopToken) -> Result<WorkResult, SchedulerError> {
        match self {
            WorkUnit::Blocking(work) => {
                let work = Arc::clone(work);
                let token = token.clone();
                tokio::task::spawn_blocking(move || work(&token))
                    .await
                    .map_err(join_error)
            }
            WorkUnit::Suspending(work) => tokio::spawn(work(token.clone())).await.map_err(join_error),
        }
    }
}

impl std::fmt::Debug for WorkUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WorkUnit::{}", self.kind())
    }
}

// ============================================================================
// ONE-SHOT WORK
// ============================================================================

/// A single piece of work handed to [`TaskScheduler::submit`](super::TaskScheduler::submit).
pub enum Work<T> {
    Blocking(Box<dyn FnOnce(&StopToken) -> T + Send + 'static>),
    Suspending(BoxFuture<T>),
}

impl<T: Send + 'static> Work<T> {
    pub fn blocking<F>(work: F) -> Self
    where
        F: FnOnce(&StopToken) -> T + Send + 'static,
    {
        Work::Blocking(Box::new(work))
    }

    pub fn suspending<Fut>(work: Fut) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        Work::Suspending(Box::pin(work))
    }

    pub(crate) async fn run(self, token: StopToken) -> Result<T, SchedulerError> {
        match self {
            Work::Blocking(work) => tokio::task::spawn_blocking(move || work(&token))
                .await
                .map_err(join_error),
            Work::Suspending(fut) => tokio::spawn(fut).await.map_err(join_error),
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> SchedulerError {
    if err.is_panic() {
        SchedulerError::WorkPanicked
    } else {
        SchedulerError::Cancelled
    }
}

// ============================================================================
// WORK HANDLE
// ============================================================================

/// Result slot for submitted work.
///
/// Wait on it from a plain thread with [`WorkHandle::wait`], or `.await` it
/// from async code.
#[must_use = "dropping the handle discards the work's result"]
pub struct WorkHandle<T> {
    rx: oneshot::Receiver<Result<T, SchedulerError>>,
}

impl<T> WorkHandle<T> {
    pub(crate) fn new(rx: oneshot::Receiver<Result<T, SchedulerError>>) -> Self {
        Self { rx }
    }

    /// A handle that is already resolved to `value`.
    pub fn ready(value: T) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Ok(value));
        Self { rx }
    }

    /// Block the current thread until the work finishes.
    ///
    /// Panics if called from inside an async runtime; `.await` the handle there.
    pub fn wait(self) -> Result<T, SchedulerError> {
        self.rx.blocking_recv().unwrap_or(Err(SchedulerError::Cancelled))
    }
}

impl<T> Future for WorkHandle<T> {
    type Output = Result<T, SchedulerError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(SchedulerError::Cancelled)))
    }
}
