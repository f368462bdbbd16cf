//! Error types shared by the scheduler, the sweep executor and the device ports

use thiserror::Error;

/// Failure reported by a device port (servo PWM output or distance sensor).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("write to {device} failed: {reason}")]
    Write { device: &'static str, reason: String },

    #[error("read from {device} failed: {reason}")]
    Read { device: &'static str, reason: String },

    #[error("{device} did not respond in time")]
    Timeout { device: &'static str },

    #[error("{device} is disconnected")]
    Disconnected { device: &'static str },
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `submit` was called before `start` or after `stop`.
    #[error("scheduler is not started")]
    NotStarted,

    #[error("scheduler interval must be positive")]
    InvalidInterval,

    /// The work was dropped because the scheduler shut down first.
    #[error("work was cancelled by scheduler shutdown")]
    Cancelled,

    #[error("work panicked")]
    WorkPanicked,

    #[error("failed to build execution context: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SweepError {
    /// Another sweep is already driving this actuator.
    #[error("a sweep is already in progress on this actuator")]
    Busy,

    #[error("sweep cancelled at {at_angle:.2} degrees")]
    Cancelled { at_angle: f64 },

    #[error("sweep aborted: {0}")]
    Device(#[from] DeviceError),

    #[error("invalid motion command: {0}")]
    Invalid(#[from] CommandError),
}

/// Rejections produced when validating a raw motion request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("angle {0} is outside [0, 180]")]
    AngleOutOfRange(i64),

    #[error("sweep time {0} s is outside [0.5, 60]")]
    SweepTimeOutOfRange(f64),

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Error type returned by recurring work units.
pub type WorkError = Box<dyn std::error::Error + Send + Sync + 'static>;
