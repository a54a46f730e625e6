use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source. Unaffected by wall-clock adjustments.
pub trait Timer: Send + Sync {
    /// Time elapsed since the timer's origin.
    fn now(&self) -> Duration;

    fn elapsed(&self, since: Duration) -> Duration {
        self.now().saturating_sub(since)
    }
}

/// Production timer backed by `Instant`.
#[derive(Debug, Clone)]
pub struct MonotonicTimer {
    start: Instant,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for MonotonicTimer {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually advanced timer for simulation and tests. Clones share one clock.
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    nanos: Arc<AtomicU64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, d: Duration) {
        self.nanos.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, t: Duration) {
        self.nanos.store(t.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_timer_never_goes_backwards() {
        let timer = MonotonicTimer::new();
        let a = timer.now();
        let b = timer.now();
        assert!(b >= a);
    }

    #[test]
    fn manual_timer_clones_share_the_clock() {
        let timer = ManualTimer::new();
        let handle = timer.clone();
        handle.advance(Duration::from_millis(250));
        assert_eq!(timer.now(), Duration::from_millis(250));
        assert_eq!(timer.elapsed(Duration::from_millis(100)), Duration::from_millis(150));
        assert_eq!(timer.elapsed(Duration::from_secs(1)), Duration::ZERO);
    }
}
