use crate::timer::Timer;
use std::sync::Arc;
use std::time::Duration;

/// Interval stopwatch used by the polling waits. `reset()` sets the zero
/// point; `elapsed()` reads the shared monotonic timer against it.
#[derive(Clone)]
pub struct Stopwatch {
    timer: Arc<dyn Timer>,
    zero: Duration,
}

impl Stopwatch {
    pub fn new(timer: Arc<dyn Timer>) -> Self {
        let zero = timer.now();
        Self { timer, zero }
    }

    pub fn reset(&mut self) {
        self.zero = self.timer.now();
    }

    pub fn elapsed(&self) -> Duration {
        self.timer.elapsed(self.zero)
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Zero point on the underlying timer.
    pub fn started_at(&self) -> Duration {
        self.zero
    }
}

impl std::fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stopwatch").field("zero", &self.zero).finish()
    }
}
