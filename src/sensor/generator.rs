use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::ultrasonic::EchoTimer;
use crate::error::DeviceError;

struct EchoState {
    rng: StdRng,
    pings: u64,
    base_distance_cm: f64,
    noise_amplitude_cm: f64,
    speed_of_sound_m_s: f64,
    fail_next: u32,
    lost_echoes: u32,
}

/// Simulated ranger echo: a base distance plus seeded uniform noise.
///
/// Clones share state, so a test can move one clone into a sensor and steer
/// the other.
#[derive(Clone)]
pub struct SimulatedEcho {
    state: Arc<Mutex<EchoState>>,
}

impl SimulatedEcho {
    pub fn new(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(EchoState {
                rng: StdRng::seed_from_u64(seed),
                pings: 0,
                base_distance_cm: 50.0,
                noise_amplitude_cm: 2.0,
                speed_of_sound_m_s: 343.26,
                fail_next: 0,
                lost_echoes: 0,
            })),
        }
    }

    pub fn with_distance(self, base_distance_cm: f64, noise_amplitude_cm: f64) -> Self {
        {
            let mut state = self.state.lock();
            state.base_distance_cm = base_distance_cm;
            state.noise_amplitude_cm = noise_amplitude_cm.abs();
        }
        self
    }

    pub fn pings(&self) -> u64 {
        self.state.lock().pings
    }

    /// Shift the simulated obstacle by `delta_cm`.
    pub fn inject_disturbance(&self, delta_cm: f64) {
        self.state.lock().base_distance_cm += delta_cm;
    }

    /// The next `count` pings fail with a read error.
    pub fn fail_next(&self, count: u32) {
        self.state.lock().fail_next = count;
    }

    /// The next `count` pings get no echo back.
    pub fn lose_echoes(&self, count: u32) {
        self.state.lock().lost_echoes = count;
    }
}

impl EchoTimer for SimulatedEcho {
    fn measure_echo(&mut self) -> Result<Option<Duration>, DeviceError> {
        let mut state = self.state.lock();
        state.pings += 1;

        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(DeviceError::Read {
                device: "simulated-echo",
                reason: "injected read fault".to_string(),
            });
        }
        if state.lost_echoes > 0 {
            state.lost_echoes -= 1;
            return Ok(None);
        }

        let amplitude = state.noise_amplitude_cm;
        let noise = if amplitude > 0.0 {
            state.rng.gen_range(-amplitude..amplitude)
        } else {
            0.0
        };
        let distance_m = (state.base_distance_cm + noise).max(0.0) / 100.0;
        let round_trip = 2.0 * distance_m / state.speed_of_sound_m_s;
        Ok(Some(Duration::from_secs_f64(round_trip)))
    }
}
