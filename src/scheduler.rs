//! Scheduler module - periodic background work on an isolated execution context
//!
//! A [`TaskScheduler`] owns one dedicated thread running a single cooperative
//! loop. The loop invokes an optional recurring [`WorkUnit`] every `interval`
//! and hosts one-shot [`Work`] handed over through [`TaskScheduler::submit`].
//! Blocking work is moved onto a bounded pool of worker threads so it never
//! stalls the loop itself.

mod context;
pub mod signal;
pub mod work;

use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::SchedulerError;
use context::ExecutionContext;

pub use signal::{StopSignal, StopToken};
pub use work::{BoxFuture, Work, WorkHandle, WorkResult, WorkUnit};

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BLOCKING_SLOTS: usize = 4;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub shutdown_timeout: Duration,
    pub blocking_slots: usize,
}

impl SchedulerConfig {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            blocking_slots: DEFAULT_BLOCKING_SLOTS,
        }
    }

    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn with_blocking_slots(mut self, slots: usize) -> Self {
        self.blocking_slots = slots;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::every(Duration::from_secs(1))
    }
}

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Idle => write!(f, "Idle"),
            WorkerState::Starting => write!(f, "Starting"),
            WorkerState::Running => write!(f, "Running"),
            WorkerState::Stopping => write!(f, "Stopping"),
        }
    }
}

/// What [`TaskScheduler::stop`] found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// There was nothing to stop.
    NotRunning,
    /// The context exited within the shutdown timeout.
    Clean,
    /// The context overran the shutdown timeout and was detached.
    TimedOut,
}

// ============================================================================
// TASK SCHEDULER
// ============================================================================

pub struct TaskScheduler {
    name: String,
    config: SchedulerConfig,
    recurring: Option<WorkUnit>,
    // Serialises start/stop; `context` itself is only locked briefly.
    lifecycle: Mutex<()>,
    context: Mutex<Option<ExecutionContext>>,
    state: RwLock<WorkerState>,
}

impl TaskScheduler {
    pub fn new(
        name: impl Into<String>,
        config: SchedulerConfig,
        recurring: Option<WorkUnit>,
    ) -> Result<Self, SchedulerError> {
        if config.interval.is_zero() {
            return Err(SchedulerError::InvalidInterval);
        }
        Ok(Self {
            name: name.into(),
            config,
            recurring,
            lifecycle: Mutex::new(()),
            context: Mutex::new(None),
            state: RwLock::new(WorkerState::Idle),
        })
    }

    /// A scheduler with a recurring unit invoked every `interval`.
    pub fn periodic(
        name: impl Into<String>,
        interval: Duration,
        work: WorkUnit,
    ) -> Result<Self, SchedulerError> {
        Self::new(name, SchedulerConfig::every(interval), Some(work))
    }

    /// A scheduler that only hosts submitted work.
    pub fn host(name: impl Into<String>, config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::new(name, config, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.context.lock().as_ref().is_some_and(ExecutionContext::is_alive)
    }

    /// Start the execution context. Returns once the loop is ready to accept
    /// work; a no-op when already running.
    pub fn start(&self) -> Result<(), SchedulerError> {
        let _lifecycle = self.lifecycle.lock();

        if let Some(context) = self.context.lock().as_ref() {
            if context.is_alive() {
                debug!(scheduler = %self.name, "start ignored, already running");
                return Ok(());
            }
        }
        // A context whose thread died on its own is discarded and rebuilt.
        let stale = self.context.lock().take();
        if let Some(stale) = stale {
            stale.shutdown(&self.name, self.config.shutdown_timeout);
        }

        *self.state.write() = WorkerState::Starting;
        match ExecutionContext::spawn(&self.name, &self.config, self.recurring.clone()) {
            Ok(context) => {
                *self.context.lock() = Some(context);
                *self.state.write() = WorkerState::Running;
                info!(
                    scheduler = %self.name,
                    interval_ms = self.config.interval.as_millis() as u64,
                    "scheduler started"
                );
                Ok(())
            }
            Err(err) => {
                *self.state.write() = WorkerState::Idle;
                Err(err)
            }
        }
    }

    /// Stop the loop and tear the context down.
    ///
    /// Never waits longer than the configured shutdown timeout. Blocking work
    /// still running at that point is abandoned, not joined.
    pub fn stop(&self) -> StopOutcome {
        let _lifecycle = self.lifecycle.lock();

        let Some(context) = self.context.lock().take() else {
            debug!(scheduler = %self.name, "stop ignored, not running");
            return StopOutcome::NotRunning;
        };

        *self.state.write() = WorkerState::Stopping;
        let outcome = context.shutdown(&self.name, self.config.shutdown_timeout);
        *self.state.write() = WorkerState::Idle;
        info!(scheduler = %self.name, ?outcome, "scheduler stopped");
        outcome
    }

    /// Hand a one-shot piece of work to the execution context.
    ///
    /// Work units never overlap within one scheduler, but submitted work has
    /// no ordering guarantee relative to the recurring unit.
    pub fn submit<T: Send + 'static>(&self, work: Work<T>) -> Result<WorkHandle<T>, SchedulerError> {
        let context = self.context.lock();
        match context.as_ref() {
            Some(context) if context.is_alive() => Ok(context.submit(work)),
            _ => Err(SchedulerError::NotStarted),
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("recurring", &self.recurring)
            .field("state", &self.state())
            .finish()
    }
}
