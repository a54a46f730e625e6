//! Monotonic clocks, the interval stopwatch and refresh-time statistics.

pub mod frame;
pub mod stopwatch;
pub mod timer;

pub use frame::{FrameStats, FrameTimes};
pub use stopwatch::Stopwatch;
pub use timer::{ManualTimer, MonotonicTimer, Timer};
