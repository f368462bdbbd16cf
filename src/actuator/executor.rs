use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::profile::Trajectory;
use super::{ActuatorPort, MotionCommand};
use crate::error::{DeviceError, SweepError};
use crate::metrics::TimingMetrics;
use crate::scheduler::StopToken;

// Ticks never get shorter than this, whatever the configured rate.
const MIN_TICK: Duration = Duration::from_micros(100);

// ============================================================================
// SWEEP CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Trajectory evaluation rate.
    pub update_hz: f64,
    /// Smallest change worth sending to the actuator.
    pub min_step_deg: f64,
    /// Moves smaller than this are applied immediately.
    pub epsilon_deg: f64,
    /// Failed writes in a row before a sweep gives up.
    pub max_consecutive_failures: u32,
}

impl SweepConfig {
    pub fn tick(&self) -> Duration {
        let hz = if self.update_hz.is_finite() && self.update_hz > 0.0 {
            self.update_hz
        } else {
            Self::default().update_hz
        };
        Duration::from_secs_f64(1.0 / hz).max(MIN_TICK)
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            update_hz: 200.0,
            min_step_deg: 0.2,
            epsilon_deg: 1e-6,
            max_consecutive_failures: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub start_angle: f64,
    pub target_angle: f64,
    pub final_angle: f64,
    /// Position commands actually written, including the final one.
    pub commands_emitted: usize,
    pub ticks: u64,
    pub elapsed: Duration,
}

// ============================================================================
// MOTION PROFILE EXECUTOR
// ============================================================================

struct ActuatorState<A> {
    port: A,
    last_emitted: f64,
}

/// Drives one actuator through eased, time-bounded sweeps.
///
/// Owns the actuator and its position. A sweep holds the actuator for its
/// whole duration and hard-sleeps between ticks, so run it on a thread that
/// may block (see [`SweepController`](super::SweepController)). A second sweep
/// requested while one is active is rejected with [`SweepError::Busy`].
pub struct MotionProfileExecutor<A> {
    state: Mutex<ActuatorState<A>>,
    // Last successfully applied angle, readable while a sweep holds `state`.
    position: AtomicU64,
    limits: (f64, f64),
    config: SweepConfig,
    metrics: Option<TimingMetrics>,
}

impl<A: ActuatorPort> MotionProfileExecutor<A> {
    /// Take ownership of `port` and move it to `initial_angle` (clamped).
    pub fn new(mut port: A, config: SweepConfig, initial_angle: f64) -> Result<Self, DeviceError> {
        let limits = port.limits();
        let initial = initial_angle.clamp(limits.0, limits.1);
        port.set_position(initial)?;

        Ok(Self {
            state: Mutex::new(ActuatorState {
                port,
                last_emitted: initial,
            }),
            position: AtomicU64::new(initial.to_bits()),
            limits,
            config,
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: TimingMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn limits(&self) -> (f64, f64) {
        self.limits
    }

    /// Current actuator position: the last angle the device accepted.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    pub fn is_sweeping(&self) -> bool {
        self.state.is_locked()
    }

    /// Set the position immediately, without a trajectory.
    pub fn set_angle(&self, angle: f64) -> Result<SweepReport, SweepError> {
        self.sweep(MotionCommand::immediate(angle))
    }

    /// Run a sweep to completion. Blocks for the command's full duration.
    pub fn sweep(&self, command: MotionCommand) -> Result<SweepReport, SweepError> {
        self.sweep_until(command, &StopToken::never())
    }

    /// Run a sweep, checking `stop` once per tick.
    ///
    /// Durations above [`MAX_SWEEP_TIME_S`](super::MAX_SWEEP_TIME_S) are capped.
    pub fn sweep_until(&self, command: MotionCommand, stop: &StopToken) -> Result<SweepReport, SweepError> {
        command.validate()?;
        let mut state = self.state.try_lock().ok_or(SweepError::Busy)?;
        let started = Instant::now();
        let start_angle = self.position();
        let target = command.target_angle.clamp(self.limits.0, self.limits.1);
        let tick = self.config.tick();
        let mut failures = 0u32;

        let duration = match command.sweep_duration() {
            Some(duration) if (target - start_angle).abs() >= self.config.epsilon_deg => duration,
            _ => {
                self.emit_until_applied(&mut state, target, &mut failures, tick)?;
                debug!(target_angle = target, "position set without sweep");
                return Ok(SweepReport {
                    start_angle,
                    target_angle: target,
                    final_angle: target,
                    commands_emitted: 1,
                    ticks: 0,
                    elapsed: started.elapsed(),
                });
            }
        };

        let trajectory = Trajectory::new(start_angle, target, duration);
        let tick_nanos = tick.as_nanos();
        let mut commands_emitted = 0usize;
        let mut ticks = 0u64;

        debug!(start_angle, target_angle = target, ?duration, ?tick, "sweep started");
        state.last_emitted = start_angle;
        let t0 = Instant::now();

        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(t0);
            if trajectory.is_complete(elapsed) {
                break;
            }
            if stop.is_stopped() {
                let at_angle = self.position();
                info!(at_angle, target_angle = target, "sweep cancelled");
                return Err(SweepError::Cancelled { at_angle });
            }
            ticks += 1;

            let angle = trajectory.angle_at(elapsed);
            if (angle - state.last_emitted).abs() >= self.config.min_step_deg {
                match self.emit(&mut state, angle) {
                    Ok(()) => {
                        commands_emitted += 1;
                        failures = 0;
                    }
                    Err(err) => {
                        failures += 1;
                        warn!(angle, failures, error = %err, "actuator write failed during sweep");
                        if failures >= self.failure_budget() {
                            return Err(SweepError::Device(err));
                        }
                    }
                }
            }

            // Sleep only what is left of this tick so overruns don't pile up.
            let spent = now.elapsed().as_nanos() % tick_nanos;
            let residual = tick - Duration::from_nanos(spent as u64);
            let sleep_start = Instant::now();
            thread::sleep(residual);
            if let Some(metrics) = &self.metrics {
                metrics.record_tick_lateness(sleep_start.elapsed().saturating_sub(residual));
            }
        }

        // The final command shares the budget with the ticks before it.
        self.emit_until_applied(&mut state, target, &mut failures, tick)?;
        commands_emitted += 1;

        let elapsed = started.elapsed();
        if let Some(metrics) = &self.metrics {
            metrics.record_sweep(elapsed);
        }
        info!(
            start_angle,
            target_angle = target,
            commands_emitted,
            ticks,
            elapsed_ms = elapsed.as_millis() as u64,
            "sweep complete"
        );

        Ok(SweepReport {
            start_angle,
            target_angle: target,
            final_angle: target,
            commands_emitted,
            ticks,
            elapsed,
        })
    }

    fn failure_budget(&self) -> u32 {
        self.config.max_consecutive_failures.max(1)
    }

    /// Write `angle`, retrying once per tick until the device accepts it or
    /// `failures` reaches the budget.
    fn emit_until_applied(
        &self,
        state: &mut ActuatorState<A>,
        angle: f64,
        failures: &mut u32,
        tick: Duration,
    ) -> Result<(), DeviceError> {
        loop {
            match self.emit(state, angle) {
                Ok(()) => {
                    *failures = 0;
                    return Ok(());
                }
                Err(err) => {
                    *failures += 1;
                    warn!(angle, failures = *failures, error = %err, "actuator write failed");
                    if *failures >= self.failure_budget() {
                        return Err(err);
                    }
                    thread::sleep(tick);
                }
            }
        }
    }

    fn emit(&self, state: &mut ActuatorState<A>, angle: f64) -> Result<(), DeviceError> {
        state.port.set_position(angle)?;
        state.last_emitted = angle;
        self.position.store(angle.to_bits(), Ordering::Release);
        Ok(())
    }
}
