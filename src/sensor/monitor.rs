use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::info;

use super::filter::MovingAverage;
use super::{DistanceSample, SensorPort};
use crate::error::{DeviceError, SchedulerError};
use crate::metrics::TimingMetrics;
use crate::scheduler::{SchedulerConfig, StopOutcome, TaskScheduler, WorkUnit, WorkerState};

/// Fastest cadence the ranger can be pinged at reliably.
pub const MIN_SAMPLE_INTERVAL_S: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub interval_s: f64,
    pub smoothing_window: usize,
    pub shutdown_timeout_s: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_s: MIN_SAMPLE_INTERVAL_S,
            smoothing_window: 5,
            shutdown_timeout_s: 5.0,
        }
    }
}

impl MonitorConfig {
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, SchedulerError> {
        let interval = Duration::try_from_secs_f64(self.interval_s)
            .ok()
            .filter(|interval| !interval.is_zero())
            .ok_or(SchedulerError::InvalidInterval)?;
        let shutdown_timeout = Duration::try_from_secs_f64(self.shutdown_timeout_s)
            .unwrap_or(crate::scheduler::DEFAULT_SHUTDOWN_TIMEOUT);
        // Sampling is one unit at a time; a single blocking slot is enough.
        Ok(SchedulerConfig::every(interval)
            .with_shutdown_timeout(shutdown_timeout)
            .with_blocking_slots(1))
    }
}

// ============================================================================
// DISTANCE MONITOR - periodic sampling on its own execution context
// ============================================================================

pub struct DistanceMonitor<S> {
    sensor: Arc<Mutex<S>>,
    latest: Arc<RwLock<Option<DistanceSample>>>,
    samples: Arc<AtomicU64>,
    worker: TaskScheduler,
}

impl<S: SensorPort + 'static> DistanceMonitor<S> {
    pub fn new(sensor: S, config: &MonitorConfig, metrics: TimingMetrics) -> Result<Self, SchedulerError> {
        let sensor = Arc::new(Mutex::new(sensor));
        let latest = Arc::new(RwLock::new(None));
        let samples = Arc::new(AtomicU64::new(0));
        let filter = Mutex::new(MovingAverage::new(config.smoothing_window));

        let work = {
            let sensor = Arc::clone(&sensor);
            let latest = Arc::clone(&latest);
            let samples = Arc::clone(&samples);
            WorkUnit::blocking(move |_stop| {
                let started = Instant::now();
                let distance_cm = match sensor.lock().read_distance() {
                    Ok(distance_cm) => distance_cm,
                    Err(err) => {
                        metrics.record_sample_failure();
                        return Err(err.into());
                    }
                };
                metrics.record_sample(started.elapsed());

                let sequence = samples.fetch_add(1, Ordering::Relaxed) + 1;
                let smoothed_cm = filter.lock().push(distance_cm);
                info!(sequence, distance_cm, smoothed_cm, "Distance: {distance_cm:.1} cm");

                *latest.write() = Some(DistanceSample {
                    sequence,
                    distance_cm,
                    smoothed_cm,
                    taken_at: started,
                });
                Ok(())
            })
        };

        let worker = TaskScheduler::new("distance-monitor", config.scheduler_config()?, Some(work))?;
        Ok(Self {
            sensor,
            latest,
            samples,
            worker,
        })
    }

    pub fn start(&self) -> Result<(), SchedulerError> {
        self.worker.start()
    }

    pub fn stop(&self) -> StopOutcome {
        self.worker.stop()
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    /// Read the sensor right now, outside the sampling cadence.
    pub fn read_now(&self) -> Result<f64, DeviceError> {
        self.sensor.lock().read_distance()
    }

    /// Most recent sample taken by the periodic loop.
    pub fn latest(&self) -> Option<DistanceSample> {
        *self.latest.read()
    }

    pub fn samples_taken(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }
}
