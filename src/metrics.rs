//! Metrics module - timing statistics for sweeps and sampling

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// TIMING METRICS - Thread-safe performance tracking
// ============================================================================

/// Shared timing histograms. Clones record into the same histograms.
#[derive(Clone)]
pub struct TimingMetrics {
    // How late each sweep tick woke up relative to its planned sleep
    tick_lateness_hist: Arc<Mutex<Histogram<u64>>>,
    sweep_hist: Arc<Mutex<Histogram<u64>>>,
    sample_hist: Arc<Mutex<Histogram<u64>>>,
    sample_failures: Arc<AtomicU64>,
}

fn histogram() -> Histogram<u64> {
    // 3 significant figures is always within hdrhistogram's supported range
    Histogram::new(3).expect("valid histogram precision")
}

impl TimingMetrics {
    pub fn new() -> Self {
        Self {
            tick_lateness_hist: Arc::new(Mutex::new(histogram())),
            sweep_hist: Arc::new(Mutex::new(histogram())),
            sample_hist: Arc::new(Mutex::new(histogram())),
            sample_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_tick_lateness(&self, lateness: Duration) {
        self.tick_lateness_hist.lock().record(lateness.as_nanos() as u64).ok();
    }

    pub fn record_sweep(&self, duration: Duration) {
        self.sweep_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_sample(&self, duration: Duration) {
        self.sample_hist.lock().record(duration.as_nanos() as u64).ok();
    }

    pub fn record_sample_failure(&self) {
        self.sample_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn report(&self) -> MetricsReport {
        let lateness = self.tick_lateness_hist.lock();
        let sweeps = self.sweep_hist.lock();
        let samples = self.sample_hist.lock();

        MetricsReport {
            ticks: lateness.len(),
            tick_lateness_p50: Duration::from_nanos(lateness.value_at_quantile(0.5)),
            tick_lateness_p99: Duration::from_nanos(lateness.value_at_quantile(0.99)),
            tick_lateness_max: Duration::from_nanos(lateness.max()),
            sweeps: sweeps.len(),
            sweep_p50: Duration::from_nanos(sweeps.value_at_quantile(0.5)),
            samples: samples.len(),
            sample_p50: Duration::from_nanos(samples.value_at_quantile(0.5)),
            sample_p99: Duration::from_nanos(samples.value_at_quantile(0.99)),
            sample_failures: self.sample_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TimingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// METRICS REPORT - Summary statistics
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub ticks: u64,
    pub tick_lateness_p50: Duration,
    pub tick_lateness_p99: Duration,
    pub tick_lateness_max: Duration,
    pub sweeps: u64,
    pub sweep_p50: Duration,
    pub samples: u64,
    pub sample_p50: Duration,
    pub sample_p99: Duration,
    pub sample_failures: u64,
}
