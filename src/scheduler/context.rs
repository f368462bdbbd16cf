use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use tokio::runtime::{Builder, Handle};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::AbortHandle;
use tracing::{debug, error, warn};

use super::signal::{StopSignal, StopToken};
use super::work::{Work, WorkHandle, WorkUnit};
use super::{SchedulerConfig, StopOutcome};
use crate::error::SchedulerError;

/// Everything the context thread hands back once its loop exists.
struct Ready {
    handle: Handle,
    signal: StopSignal,
    token: StopToken,
    gate: Arc<AsyncMutex<()>>,
    recurring: AbortHandle,
}

/// One live execution context: a dedicated thread driving a single-threaded
/// runtime, plus that runtime's bounded blocking pool.
pub(crate) struct ExecutionContext {
    handle: Handle,
    signal: StopSignal,
    token: StopToken,
    // Held by whichever work unit is running; at most one per context.
    gate: Arc<AsyncMutex<()>>,
    recurring: AbortHandle,
    shutdown_tx: oneshot::Sender<()>,
    exited_rx: Receiver<()>,
    thread: thread::JoinHandle<()>,
}

impl ExecutionContext {
    /// Spawn the context thread and block until it reports ready.
    pub(crate) fn spawn(
        name: &str,
        config: &SchedulerConfig,
        recurring: Option<WorkUnit>,
    ) -> Result<Self, SchedulerError> {
        let (ready_tx, ready_rx) = bounded::<std::io::Result<Ready>>(1);
        let (exited_tx, exited_rx) = bounded::<()>(1);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let interval = config.interval;
        // Half the budget goes to the runtime draining its own tasks, so a
        // context that only has overrunning blocking work still exits in time.
        let runtime_budget = config.shutdown_timeout / 2;
        let slots = config.blocking_slots.max(1);
        let loop_name = name.to_string();

        let thread = thread::Builder::new()
            .name(format!("{name}-loop"))
            .spawn(move || {
                let runtime = match Builder::new_current_thread()
                    .enable_time()
                    .max_blocking_threads(slots)
                    .thread_name(format!("{loop_name}-worker"))
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };

                runtime.block_on(async move {
                    let (signal, token) = StopSignal::new();
                    let gate = Arc::new(AsyncMutex::new(()));
                    let task = tokio::spawn(run_loop(
                        loop_name,
                        recurring,
                        interval,
                        token.clone(),
                        Arc::clone(&gate),
                    ));
                    let ready = Ready {
                        handle: Handle::current(),
                        signal,
                        token,
                        gate,
                        recurring: task.abort_handle(),
                    };
                    if ready_tx.send(Ok(ready)).is_err() {
                        return;
                    }
                    // Resolves on an explicit shutdown or when the owner is dropped.
                    let _ = shutdown_rx.await;
                });

                runtime.shutdown_timeout(runtime_budget);
                let _ = exited_tx.send(());
            })?;

        match ready_rx.recv() {
            Ok(Ok(ready)) => Ok(Self {
                handle: ready.handle,
                signal: ready.signal,
                token: ready.token,
                gate: ready.gate,
                recurring: ready.recurring,
                shutdown_tx,
                exited_rx,
                thread,
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(SchedulerError::Runtime(err))
            }
            Err(_) => {
                let _ = thread.join();
                Err(SchedulerError::Runtime(std::io::Error::other(
                    "execution context exited before becoming ready",
                )))
            }
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        !self.thread.is_finished()
    }

    pub(crate) fn submit<T: Send + 'static>(&self, work: Work<T>) -> WorkHandle<T> {
        let (tx, rx) = oneshot::channel();
        let gate = Arc::clone(&self.gate);
        let token = self.token.clone();
        self.handle.spawn(async move {
            let _turn = gate.lock().await;
            let _ = tx.send(work.run(token).await);
        });
        WorkHandle::new(rx)
    }

    /// Signal stop, cancel the recurring task and wait up to `timeout` for
    /// the thread to exit. On timeout the thread is left detached.
    pub(crate) fn shutdown(self, name: &str, timeout: Duration) -> StopOutcome {
        self.signal.trigger();
        self.recurring.abort();
        let _ = self.shutdown_tx.send(());

        match self.exited_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    warn!(scheduler = name, "execution context thread panicked");
                }
                StopOutcome::Clean
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    scheduler = name,
                    timeout_ms = timeout.as_millis() as u64,
                    "execution context did not exit in time, detaching it"
                );
                StopOutcome::TimedOut
            }
        }
    }
}

async fn run_loop(
    name: String,
    work: Option<WorkUnit>,
    interval: Duration,
    token: StopToken,
    gate: Arc<AsyncMutex<()>>,
) {
    let Some(work) = work else {
        token.stopped().await;
        return;
    };

    debug!(scheduler = %name, kind = work.kind(), ?interval, "recurring loop started");
    while !token.is_stopped() {
        {
            let _turn = gate.lock().await;
            match work.invoke(&token).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(scheduler = %name, error = %err, "work unit failed"),
                Err(err) => error!(scheduler = %name, error = %err, "work unit did not complete"),
            }
        }

        tokio::select! {
            _ = token.stopped() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!(scheduler = %name, "recurring loop finished");
}
