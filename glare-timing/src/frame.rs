use std::collections::VecDeque;
use std::time::Duration;

/// Summary of recorded presentation refresh durations.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameStats {
    pub samples: usize,
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

/// Bounded buffer of refresh durations.
#[derive(Debug, Clone)]
pub struct FrameTimes {
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl FrameTimes {
    pub fn new(max_samples: usize) -> Self {
        Self {
            frame_times: VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, d: Duration) {
        if self.frame_times.len() >= self.max_samples {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(d);
    }

    pub fn len(&self) -> usize {
        self.frame_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame_times.is_empty()
    }

    pub fn clear(&mut self) {
        self.frame_times.clear();
    }

    pub fn stats(&self) -> FrameStats {
        if self.frame_times.is_empty() {
            return FrameStats::default();
        }
        let times: Vec<f64> = self
            .frame_times
            .iter()
            .map(|d| d.as_nanos() as f64)
            .collect();
        let n = times.len() as f64;
        let avg = times.iter().sum::<f64>() / n;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        FrameStats {
            samples: times.len(),
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

impl Default for FrameTimes {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_constant_frames_have_no_jitter() {
        let mut frames = FrameTimes::new(10);
        for _ in 0..4 {
            frames.record(Duration::from_millis(10));
        }
        let stats = frames.stats();
        assert_eq!(stats.samples, 4);
        assert_eq!(stats.jitter_ns, 0.0);
        assert!((stats.effective_fps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn buffer_drops_oldest_sample() {
        let mut frames = FrameTimes::new(2);
        frames.record(Duration::from_millis(1));
        frames.record(Duration::from_millis(2));
        frames.record(Duration::from_millis(3));
        let stats = frames.stats();
        assert_eq!(frames.len(), 2);
        assert_eq!(stats.min_frame_time_ns, 2e6);
        assert_eq!(stats.max_frame_time_ns, 3e6);
    }

    #[test]
    fn empty_buffer_reports_zeroes() {
        assert_eq!(FrameTimes::default().stats(), FrameStats::default());
    }
}
