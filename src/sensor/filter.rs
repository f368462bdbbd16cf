use std::collections::VecDeque;

/// Mean of the last `capacity` distance readings, used for `smoothed_cm`.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    readings: VecDeque<f64>,
    capacity: usize,
    total: f64,
}

impl MovingAverage {
    /// A window of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity,
            total: 0.0,
        }
    }

    /// Add a reading, evicting the oldest once the window is full, and
    /// return the new mean.
    pub fn push(&mut self, reading: f64) -> f64 {
        if self.readings.len() == self.capacity {
            self.total -= self.readings.pop_front().unwrap_or_default();
        }
        self.readings.push_back(reading);
        self.total += reading;
        self.total / self.readings.len() as f64
    }

    pub fn average(&self) -> Option<f64> {
        (!self.readings.is_empty()).then(|| self.total / self.readings.len() as f64)
    }

    pub fn window(&self) -> usize {
        self.capacity
    }

    pub fn reset(&mut self) {
        self.readings.clear();
        self.total = 0.0;
    }
}
