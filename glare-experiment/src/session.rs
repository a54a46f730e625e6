//! Per-run context and the cooperative tick primitive.
//!
//! All waiting in the engine goes through [`Session::tick`]: one call polls
//! input, then refreshes the presentation. Callers check their stopwatch
//! between ticks. There is no blocking sleep anywhere, so an abort key is
//! seen within one tick wherever the run happens to be.

use crate::collab::{Background, KeySource, Presenter, Tracker};
use crate::error::{ExperimentError, Result};
use crate::event_log::EventLog;
use crate::input::InputPoller;
use glare_core::{Key, KeyPress, Position, StimulusId};
use glare_timing::{FrameStats, FrameTimes, Stopwatch, Timer};
use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const START_TRIGGER_KEYS: [Key; 2] = [Key::Char('5'), Key::Char('t')];

/// Everything a session needs from outside the engine.
pub struct Collaborators {
    pub timer: Arc<dyn Timer>,
    pub presenter: Box<dyn Presenter>,
    pub keys: Box<dyn KeySource>,
    pub tracker: Box<dyn Tracker>,
    pub log_sink: Box<dyn Write>,
}

pub struct Session {
    timer: Arc<dyn Timer>,
    presenter: Box<dyn Presenter>,
    input: InputPoller,
    log: EventLog,
    frames: FrameTimes,
    visible: BTreeSet<StimulusId>,
    last_refresh: Option<Duration>,
    torn_down: bool,
}

impl Session {
    pub fn new(collab: Collaborators) -> Self {
        let Collaborators {
            timer,
            presenter,
            keys,
            tracker,
            log_sink,
        } = collab;
        Self {
            input: InputPoller::new(keys, timer.clone()),
            log: EventLog::new(log_sink, tracker, timer.clone()),
            timer,
            presenter,
            frames: FrameTimes::default(),
            visible: BTreeSet::new(),
            last_refresh: None,
            torn_down: false,
        }
    }

    pub fn now(&self) -> Duration {
        self.timer.now()
    }

    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch::new(self.timer.clone())
    }

    /// One suspension point: sample input, then present the current scene.
    pub fn tick(&mut self, allowed: &[Key]) -> Result<Vec<KeyPress>> {
        let presses = self.input.poll(allowed)?;
        self.presenter.refresh()?;
        let now = self.timer.now();
        if let Some(prev) = self.last_refresh.replace(now) {
            self.frames.record(now.saturating_sub(prev));
        }
        Ok(presses)
    }

    /// Ticks until `duration` has elapsed, collecting presses of `allowed`.
    pub fn wait(&mut self, duration: Duration, allowed: &[Key]) -> Result<Vec<KeyPress>> {
        let watch = self.stopwatch();
        let mut presses = Vec::new();
        while watch.elapsed() < duration {
            presses.extend(self.tick(allowed)?);
        }
        Ok(presses)
    }

    /// Ticks until one of `allowed` is newly pressed.
    pub fn wait_for_keys(&mut self, allowed: &[Key]) -> Result<KeyPress> {
        loop {
            if let Some(press) = self.tick(allowed)?.into_iter().next() {
                return Ok(press);
            }
        }
    }

    /// Text screen held until `space`.
    pub fn instruction(&mut self, text: &str) -> Result<()> {
        self.presenter.message(Some(text));
        self.input.clear()?;
        self.wait_for_keys(&[Key::Space])?;
        self.presenter.message(None);
        Ok(())
    }

    pub fn start_trigger(&mut self) -> Result<()> {
        self.event("Waiting for start trigger")?;
        self.presenter
            .message(Some("Waiting for start trigger. Please standby..."));
        self.input.clear()?;
        self.wait_for_keys(&START_TRIGGER_KEYS)?;
        self.presenter.message(None);
        self.event("Start trigger received")
    }

    pub fn show(&mut self, id: StimulusId, at: Position) {
        self.presenter.show(id, at);
        self.visible.insert(id);
    }

    pub fn hide(&mut self, id: StimulusId) {
        self.presenter.hide(id);
        self.visible.remove(&id);
    }

    pub fn hide_all(&mut self) {
        for id in std::mem::take(&mut self.visible) {
            self.presenter.hide(id);
        }
    }

    pub fn is_visible(&self, id: StimulusId) -> bool {
        self.visible.contains(&id)
    }

    pub fn message(&mut self, text: Option<&str>) {
        self.presenter.message(text);
    }

    pub fn set_background(&mut self, background: Background) {
        self.presenter.set_background(background);
    }

    pub fn clear_input(&mut self) -> Result<()> {
        self.input.clear()
    }

    pub fn event(&mut self, msg: &str) -> Result<()> {
        self.log.event(msg)
    }

    /// Log-only line; the tracker does not see it.
    pub fn note(&mut self, msg: &str) -> Result<()> {
        self.log.note(msg)
    }

    pub fn start_recording(&mut self) -> Result<()> {
        self.log.tracker_mut().start_recording()?;
        Ok(())
    }

    /// No-op when the tracker is not recording.
    pub fn stop_recording(&mut self) -> Result<()> {
        if self.log.tracker().is_recording() {
            self.log.tracker_mut().stop_recording()?;
        }
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.log.tracker().is_recording()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Logs refresh statistics gathered since the previous report and resets them.
    pub fn report_frame_stats(&mut self, label: &str) -> Result<FrameStats> {
        let stats = self.frames.stats();
        if stats.samples > 0 {
            info!(
                "{label}: {} refreshes, avg {:.3} ms, jitter {:.3} ms, min {:.3} ms, max {:.3} ms, {:.1} Hz",
                stats.samples,
                stats.average_frame_time_ns / 1e6,
                stats.jitter_ns / 1e6,
                stats.min_frame_time_ns / 1e6,
                stats.max_frame_time_ns / 1e6,
                stats.effective_fps,
            );
            self.note(&format!(
                "{label} frame timing: avg {:.3} ms, jitter {:.3} ms, {:.1} Hz",
                stats.average_frame_time_ns / 1e6,
                stats.jitter_ns / 1e6,
                stats.effective_fps
            ))?;
        }
        self.frames.clear();
        self.last_refresh = None;
        Ok(stats)
    }

    /// Runs exactly once. Every step is attempted even if an earlier one
    /// fails; the first failure is returned.
    pub fn teardown(&mut self) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;

        let mut first: Option<ExperimentError> = None;
        let mut keep = |r: Result<()>| {
            if let Err(e) = r {
                warn!("teardown step failed: {e}");
                first.get_or_insert(e);
            }
        };

        self.hide_all();
        self.presenter.message(None);
        keep(self.presenter.refresh().map_err(Into::into));
        keep(self.log.event("*** END EXPERIMENT ***"));
        if self.log.tracker().is_recording() {
            keep(self.log.tracker_mut().stop_recording().map_err(Into::into));
        }
        keep(self.log.flush());

        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            warn!("teardown on drop failed: {e}");
        }
    }
}
