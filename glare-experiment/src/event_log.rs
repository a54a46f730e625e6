use crate::collab::Tracker;
use crate::error::{CollaboratorError, Result};
use glare_timing::Timer;
use std::io::Write;
use std::sync::Arc;
use tracing::info;

/// Timestamped behavioral event log.
///
/// Every event is written to the log sink as `<secs>\tEXP\t<message>` and
/// mirrored to the tracker link, in that order.
pub struct EventLog {
    sink: Box<dyn Write>,
    tracker: Box<dyn Tracker>,
    timer: Arc<dyn Timer>,
}

impl EventLog {
    pub fn new(sink: Box<dyn Write>, tracker: Box<dyn Tracker>, timer: Arc<dyn Timer>) -> Self {
        Self {
            sink,
            tracker,
            timer,
        }
    }

    pub fn event(&mut self, msg: &str) -> Result<()> {
        self.note(msg)?;
        self.tracker.send_message(msg)?;
        Ok(())
    }

    /// Log-only line, not forwarded to the tracker.
    pub fn note(&mut self, msg: &str) -> Result<()> {
        let t = self.timer.now().as_secs_f64();
        writeln!(self.sink, "{t:.4} \tEXP \t{msg}").map_err(CollaboratorError::from)?;
        info!(target: "glare::events", "{t:.4}\t{msg}");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush().map_err(CollaboratorError::from)?;
        Ok(())
    }

    pub fn tracker(&self) -> &dyn Tracker {
        self.tracker.as_ref()
    }

    pub fn tracker_mut(&mut self) -> &mut dyn Tracker {
        self.tracker.as_mut()
    }
}
