/// Exponentially smoothed frames-per-second estimate.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    /// Weight of the newest sample, in `(0, 1]`.
    smoothing: f32,
    fps: Option<f32>,
}

impl FpsCounter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(f32::EPSILON, 1.0),
            fps: None,
        }
    }

    /// Feeds one frame delta in seconds and returns the updated estimate.
    pub fn record(&mut self, dt: f32) -> f32 {
        if dt <= 0.0 || !dt.is_finite() {
            return self.fps.unwrap_or(0.0);
        }

        let sample = 1.0 / dt;
        let fps = match self.fps {
            Some(prev) => prev + (sample - prev) * self.smoothing,
            None => sample,
        };
        self.fps = Some(fps);
        fps
    }

    /// Zero until the first frame was recorded.
    pub fn fps(&self) -> f32 {
        self.fps.unwrap_or(0.0)
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_is_taken_as_is() {
        let mut fps = FpsCounter::default();
        assert_eq!(fps.fps(), 0.0);
        assert!((fps.record(1.0 / 60.0) - 60.0).abs() < 1e-3);
    }

    #[test]
    fn converges_toward_new_rate() {
        let mut fps = FpsCounter::new(0.5);
        fps.record(1.0 / 60.0);
        let next = fps.record(1.0 / 30.0);
        assert!((next - 45.0).abs() < 1e-3);
    }

    #[test]
    fn invalid_deltas_are_ignored() {
        let mut fps = FpsCounter::default();
        fps.record(0.5);
        assert_eq!(fps.record(0.0), 2.0);
        assert_eq!(fps.record(f32::NAN), 2.0);
    }
}
