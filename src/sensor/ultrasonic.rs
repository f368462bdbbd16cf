use std::time::Duration;

use serde::Deserialize;

use super::SensorPort;
use crate::error::DeviceError;

/// Trigger/echo pin pair of an ultrasonic ranger (HC-SR04 style).
pub trait EchoTimer: Send {
    /// Fire one ping and return the echo round-trip time, or `None` when no
    /// echo came back within the sensor's range.
    fn measure_echo(&mut self) -> Result<Option<Duration>, DeviceError>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UltrasonicSpec {
    /// Readings are capped here; "no echo" reads as this distance.
    pub max_distance_m: f64,
    pub speed_of_sound_m_s: f64,
}

impl Default for UltrasonicSpec {
    fn default() -> Self {
        Self {
            max_distance_m: 1.0,
            speed_of_sound_m_s: 343.26,
        }
    }
}

impl UltrasonicSpec {
    pub fn max_distance_cm(&self) -> f64 {
        self.max_distance_m * 100.0
    }

    /// Round-trip echo time to one-way distance in centimeters.
    pub fn echo_to_cm(&self, echo: Duration) -> f64 {
        let meters = echo.as_secs_f64() * self.speed_of_sound_m_s / 2.0;
        (meters * 100.0).clamp(0.0, self.max_distance_cm())
    }
}

pub struct UltrasonicSensor<E> {
    echo: E,
    spec: UltrasonicSpec,
}

impl<E: EchoTimer> UltrasonicSensor<E> {
    pub fn new(echo: E, spec: UltrasonicSpec) -> Self {
        Self { echo, spec }
    }

    pub fn spec(&self) -> &UltrasonicSpec {
        &self.spec
    }
}

impl<E: EchoTimer> SensorPort for UltrasonicSensor<E> {
    fn read_distance(&mut self) -> Result<f64, DeviceError> {
        Ok(match self.echo.measure_echo()? {
            Some(echo) => self.spec.echo_to_cm(echo),
            None => self.spec.max_distance_cm(),
        })
    }
}
