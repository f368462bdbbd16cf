use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::executor::{MotionProfileExecutor, SweepReport};
use super::{ActuatorPort, MotionCommand};
use crate::error::{SchedulerError, SweepError};
use crate::scheduler::{SchedulerConfig, StopOutcome, TaskScheduler, Work, WorkHandle};

pub type SweepHandle = WorkHandle<Result<SweepReport, SweepError>>;

/// Runs sweeps for one actuator on a dedicated execution context, so the
/// caller (a request handler, say) never blocks for the sweep's duration.
///
/// At most one sweep is accepted at a time; a request arriving while one is
/// queued or running resolves to [`SweepError::Busy`].
pub struct SweepController<A> {
    executor: Arc<MotionProfileExecutor<A>>,
    scheduler: TaskScheduler,
    in_flight: Arc<AtomicBool>,
}

impl<A: ActuatorPort + 'static> SweepController<A> {
    pub fn new(executor: MotionProfileExecutor<A>, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Ok(Self {
            executor: Arc::new(executor),
            scheduler: TaskScheduler::host("sweep", config)?,
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn start(&self) -> Result<(), SchedulerError> {
        self.scheduler.start()
    }

    /// Stop the sweep context. An active sweep ends at its next tick.
    pub fn stop(&self) -> StopOutcome {
        self.scheduler.stop()
    }

    pub fn executor(&self) -> &Arc<MotionProfileExecutor<A>> {
        &self.executor
    }

    pub fn position(&self) -> f64 {
        self.executor.position()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Queue a sweep and return immediately. Fails only when the controller
    /// is not started; a rejected or failed sweep shows up in the handle.
    pub fn submit(&self, command: MotionCommand) -> Result<SweepHandle, SchedulerError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(target_angle = command.target_angle, "sweep rejected, another one is in flight");
            return Ok(WorkHandle::ready(Err(SweepError::Busy)));
        }

        let guard = InFlight(Arc::clone(&self.in_flight));
        let executor = Arc::clone(&self.executor);
        self.scheduler
            .submit(Work::blocking(move |stop| {
                let _guard = guard;
                executor.sweep_until(command, stop)
            }))
    }
}

/// Clears the in-flight flag when the sweep closure finishes or is dropped
/// unrun.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
