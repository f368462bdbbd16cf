//! Actuator module - servo output, eased motion profiles and sweep execution

pub mod controller;
pub mod executor;
pub mod profile;
pub mod servo;

use std::time::Duration;

use crate::error::{CommandError, DeviceError};

pub use controller::SweepController;
pub use executor::{MotionProfileExecutor, SweepConfig, SweepReport};
pub use profile::{ease, Trajectory};
pub use servo::{AngularServo, PwmChannel, ServoSpec, SimulatedPwm};

// ============================================================================
// ACTUATOR PORT
// ============================================================================

/// Position output of a single actuator.
pub trait ActuatorPort: Send {
    /// Command a new position. Implementations clamp to [`ActuatorPort::limits`].
    fn set_position(&mut self, angle: f64) -> Result<(), DeviceError>;

    /// Inclusive `(min, max)` position range.
    fn limits(&self) -> (f64, f64);

    fn clamp(&self, angle: f64) -> f64 {
        let (min, max) = self.limits();
        angle.clamp(min, max)
    }
}

impl<A: ActuatorPort + ?Sized> ActuatorPort for Box<A> {
    fn set_position(&mut self, angle: f64) -> Result<(), DeviceError> {
        (**self).set_position(angle)
    }

    fn limits(&self) -> (f64, f64) {
        (**self).limits()
    }
}

// ============================================================================
// MOTION COMMAND
// ============================================================================

pub const MIN_REQUEST_ANGLE: i64 = 0;
pub const MAX_REQUEST_ANGLE: i64 = 180;
pub const MIN_SWEEP_TIME_S: f64 = 0.5;
pub const MAX_SWEEP_TIME_S: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionCommand {
    pub target_angle: f64,
    /// Seconds. Zero or negative means "set immediately".
    pub duration: f64,
}

impl MotionCommand {
    pub fn new(target_angle: f64, duration: f64) -> Self {
        Self { target_angle, duration }
    }

    pub fn immediate(target_angle: f64) -> Self {
        Self::new(target_angle, 0.0)
    }

    /// Validate a raw `{angle, sweep_time}` request as received at the
    /// service boundary.
    pub fn from_request(angle: i64, sweep_time: f64) -> Result<Self, CommandError> {
        if !(MIN_REQUEST_ANGLE..=MAX_REQUEST_ANGLE).contains(&angle) {
            return Err(CommandError::AngleOutOfRange(angle));
        }
        if !(MIN_SWEEP_TIME_S..=MAX_SWEEP_TIME_S).contains(&sweep_time) {
            return Err(CommandError::SweepTimeOutOfRange(sweep_time));
        }
        Ok(Self::new(angle as f64, sweep_time))
    }

    /// Reject NaN or infinite fields. Range checks are left to the executor,
    /// which clamps.
    pub fn validate(&self) -> Result<(), CommandError> {
        if !self.target_angle.is_finite() {
            return Err(CommandError::NonFinite("target angle"));
        }
        if !self.duration.is_finite() {
            return Err(CommandError::NonFinite("duration"));
        }
        Ok(())
    }

    /// How long the sweep runs, capped at [`MAX_SWEEP_TIME_S`]. `None` means
    /// the target is set immediately.
    pub fn sweep_duration(&self) -> Option<Duration> {
        if !self.duration.is_finite() {
            return None;
        }
        Duration::try_from_secs_f64(self.duration.min(MAX_SWEEP_TIME_S))
            .ok()
            .filter(|duration| !duration.is_zero())
    }
}
