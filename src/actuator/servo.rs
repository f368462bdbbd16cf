use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Deserialize;

use super::ActuatorPort;
use crate::error::DeviceError;

/// Raw PWM output a servo is wired to.
pub trait PwmChannel: Send {
    fn set_pulse_width(&mut self, width: Duration) -> Result<(), DeviceError>;
}

// ============================================================================
// SERVO SPEC
// ============================================================================

/// Angle range and pulse timing of a hobby servo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServoSpec {
    pub min_angle: f64,
    pub max_angle: f64,
    pub min_pulse_us: f64,
    pub max_pulse_us: f64,
    pub frame_us: f64,
    pub initial_angle: f64,
}

impl ServoSpec {
    /// SG90 / S90 micro servo. The datasheet says 1–2 ms, but 0.5–2.25 ms is
    /// what actually covers the full 180°.
    pub fn s90() -> Self {
        Self {
            min_angle: 0.0,
            max_angle: 180.0,
            min_pulse_us: 500.0,
            max_pulse_us: 2250.0,
            frame_us: 20_000.0,
            initial_angle: 0.0,
        }
    }

    pub fn frame(&self) -> Duration {
        Duration::from_secs_f64(self.frame_us.max(0.0) / 1e6)
    }

    /// Pulse width for `angle`, clamped into the servo's range. NaN maps to
    /// the minimum pulse.
    pub fn pulse_for(&self, angle: f64) -> Duration {
        let span = self.max_angle - self.min_angle;
        let fraction = if angle.is_nan() || span.abs() < f64::EPSILON {
            0.0
        } else {
            ((angle - self.min_angle) / span).clamp(0.0, 1.0)
        };
        let micros = self.min_pulse_us + fraction * (self.max_pulse_us - self.min_pulse_us);
        Duration::from_nanos((micros.max(0.0) * 1e3).round() as u64)
    }
}

impl Default for ServoSpec {
    fn default() -> Self {
        Self::s90()
    }
}

// ============================================================================
// ANGULAR SERVO
// ============================================================================

pub struct AngularServo<P> {
    pwm: P,
    spec: ServoSpec,
}

impl<P: PwmChannel> AngularServo<P> {
    pub fn new(pwm: P, spec: ServoSpec) -> Self {
        Self { pwm, spec }
    }

    pub fn spec(&self) -> &ServoSpec {
        &self.spec
    }

    pub fn into_inner(self) -> P {
        self.pwm
    }
}

impl<P: PwmChannel> ActuatorPort for AngularServo<P> {
    fn set_position(&mut self, angle: f64) -> Result<(), DeviceError> {
        if angle.is_nan() {
            return Err(DeviceError::Write {
                device: "angular-servo",
                reason: "angle is NaN".to_string(),
            });
        }
        let pulse = self.spec.pulse_for(self.clamp(angle));
        self.pwm.set_pulse_width(pulse)
    }

    fn limits(&self) -> (f64, f64) {
        (self.spec.min_angle, self.spec.max_angle)
    }
}

// ============================================================================
// SIMULATED PWM - stands in for a GPIO pin on hosts without hardware
// ============================================================================

#[derive(Debug, Default)]
struct PwmLog {
    pulses: Vec<Duration>,
    fail_after: Option<usize>,
    fail_next: usize,
}

/// PWM output that records every pulse width. Clones share one log, so a test
/// can keep a handle after moving the channel into a servo.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPwm {
    log: Arc<Mutex<PwmLog>>,
}

impl SimulatedPwm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> Vec<Duration> {
        self.log.lock().pulses.clone()
    }

    pub fn last_pulse(&self) -> Option<Duration> {
        self.log.lock().pulses.last().copied()
    }

    pub fn write_count(&self) -> usize {
        self.log.lock().pulses.len()
    }

    /// Every write after the first `writes` successful ones fails.
    pub fn fail_after(&self, writes: usize) {
        self.log.lock().fail_after = Some(writes);
    }

    /// The next `count` writes fail, then writes succeed again.
    pub fn fail_next(&self, count: usize) {
        self.log.lock().fail_next = count;
    }

    pub fn heal(&self) {
        let mut log = self.log.lock();
        log.fail_after = None;
        log.fail_next = 0;
    }
}

impl PwmChannel for SimulatedPwm {
    fn set_pulse_width(&mut self, width: Duration) -> Result<(), DeviceError> {
        let mut log = self.log.lock();
        if log.fail_next > 0 {
            log.fail_next -= 1;
            return Err(DeviceError::Write {
                device: "simulated-pwm",
                reason: "injected transient fault".to_string(),
            });
        }
        if log.fail_after.is_some_and(|limit| log.pulses.len() >= limit) {
            return Err(DeviceError::Disconnected { device: "simulated-pwm" });
        }
        log.pulses.push(width);
        Ok(())
    }
}
