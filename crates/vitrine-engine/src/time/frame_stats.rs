use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling average of recent frame durations.
///
/// Deltas are clamped so a debugger pause or a long minimize does not dominate
/// the average.
#[derive(Debug, Clone)]
pub struct FrameStats {
    samples: VecDeque<Duration>,
    window: usize,
    sum: Duration,
    last: Option<Instant>,
    frames: u64,
    dt_max: Duration,
}

impl FrameStats {
    /// Averages over the last `window` frames.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            sum: Duration::ZERO,
            last: None,
            frames: 0,
            dt_max: Duration::from_millis(250),
        }
    }

    /// Marks a presented frame at the current time.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            self.record(now.saturating_duration_since(last));
        } else {
            self.frames += 1;
        }
    }

    /// Adds one frame that took `dt`.
    pub fn record(&mut self, dt: Duration) {
        let dt = dt.min(self.dt_max);
        if self.samples.len() == self.window {
            if let Some(old) = self.samples.pop_front() {
                self.sum -= old;
            }
        }
        self.samples.push_back(dt);
        self.sum += dt;
        self.frames += 1;
    }

    /// Restarts timing without discarding the frame count.
    ///
    /// Used after the host stops drawing, e.g. while minimized.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.sum = Duration::ZERO;
        self.last = None;
    }

    /// Frames seen since creation.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average_frame_time(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.sum / self.samples.len() as u32)
    }

    pub fn fps(&self) -> Option<f32> {
        let avg = self.average_frame_time()?.as_secs_f32();
        (avg > 0.0).then(|| 1.0 / avg)
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new(120)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_have_no_average() {
        let stats = FrameStats::new(4);
        assert_eq!(stats.average_frame_time(), None);
        assert_eq!(stats.fps(), None);
    }

    #[test]
    fn average_over_full_window() {
        let mut stats = FrameStats::new(4);
        for _ in 0..4 {
            stats.record(Duration::from_millis(10));
        }
        assert_eq!(stats.average_frame_time(), Some(Duration::from_millis(10)));
        let fps = stats.fps().unwrap();
        assert!((fps - 100.0).abs() < 0.01);
    }

    #[test]
    fn old_samples_roll_out() {
        let mut stats = FrameStats::new(2);
        stats.record(Duration::from_millis(100));
        stats.record(Duration::from_millis(20));
        stats.record(Duration::from_millis(20));
        assert_eq!(stats.average_frame_time(), Some(Duration::from_millis(20)));
        assert_eq!(stats.frames(), 3);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let mut stats = FrameStats::new(1);
        stats.record(Duration::from_secs(5));
        assert_eq!(stats.average_frame_time(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn reset_keeps_frame_count() {
        let mut stats = FrameStats::new(4);
        stats.record(Duration::from_millis(16));
        stats.reset();
        assert_eq!(stats.average_frame_time(), None);
        assert_eq!(stats.frames(), 1);
    }

    #[test]
    fn first_tick_counts_without_sample() {
        let mut stats = FrameStats::new(4);
        stats.tick();
        assert_eq!(stats.frames(), 1);
        assert_eq!(stats.average_frame_time(), None);
    }
}
