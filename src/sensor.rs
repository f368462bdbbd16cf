//! Sensor module - distance sensing, smoothing and periodic sampling

pub mod filter;
pub mod generator;
pub mod monitor;
pub mod ultrasonic;

use std::time::Instant;

use crate::error::DeviceError;

pub use filter::MovingAverage;
pub use generator::SimulatedEcho;
pub use monitor::{DistanceMonitor, MonitorConfig};
pub use ultrasonic::{EchoTimer, UltrasonicSensor, UltrasonicSpec};

// ============================================================================
// SENSOR PORT
// ============================================================================

/// A distance sensor.
pub trait SensorPort: Send {
    /// Current distance in centimeters.
    fn read_distance(&mut self) -> Result<f64, DeviceError>;
}

impl<S: SensorPort + ?Sized> SensorPort for Box<S> {
    fn read_distance(&mut self) -> Result<f64, DeviceError> {
        (**self).read_distance()
    }
}

// ============================================================================
// DISTANCE SAMPLE
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct DistanceSample {
    pub sequence: u64,
    pub distance_cm: f64,
    /// Moving average over the monitor's smoothing window.
    pub smoothed_cm: f64,
    pub taken_at: Instant,
}
