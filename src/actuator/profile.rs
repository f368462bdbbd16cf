use std::f64::consts::PI;
use std::time::Duration;

/// Raised-cosine ease-in-out over `u ∈ [0, 1]`.
///
/// Position follows `0.5 - 0.5·cos(πu)`, so velocity is a half sine that is
/// zero at both ends and acceleration never jumps at the start or end of a
/// move. Inputs outside `[0, 1]` are clamped.
pub fn ease(u: f64) -> f64 {
    let u = u.clamp(0.0, 1.0);
    0.5 - 0.5 * (PI * u).cos()
}

/// One sweep's path from `start` to `target` over `duration`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    pub start: f64,
    pub target: f64,
    pub duration: Duration,
}

impl Trajectory {
    pub fn new(start: f64, target: f64, duration: Duration) -> Self {
        Self { start, target, duration }
    }

    pub fn delta(&self) -> f64 {
        self.target - self.start
    }

    /// Normalised progress for `elapsed` time into the sweep.
    pub fn progress(&self, elapsed: Duration) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
    }

    /// Commanded angle `elapsed` time into the sweep.
    pub fn angle_at(&self, elapsed: Duration) -> f64 {
        self.start + self.delta() * ease(self.progress(elapsed))
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}
