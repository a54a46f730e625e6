//! Seams to the outside world: presentation surface, key input and the
//! eye-tracker link. The engine only ever talks to these traits.

use crate::error::CollaboratorError;
use glare_core::{KeyEvent, Position, StimulusId};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Gray,
    White,
}

/// Retained-mode presentation surface.
///
/// `show`, `hide`, `message` and `set_background` mutate the scene;
/// nothing becomes visible until `refresh` presents it.
pub trait Presenter {
    fn show(&mut self, id: StimulusId, at: Position);
    fn hide(&mut self, id: StimulusId);
    /// Replaces the on-screen text; `None` clears it.
    fn message(&mut self, text: Option<&str>);
    fn set_background(&mut self, background: Background);
    fn refresh(&mut self) -> Result<(), CollaboratorError>;
}

/// Raw key transitions accumulated since the previous drain.
pub trait KeySource {
    fn drain(&mut self) -> Result<Vec<KeyEvent>, CollaboratorError>;
}

pub trait Tracker {
    fn send_message(&mut self, msg: &str) -> Result<(), CollaboratorError>;
    fn start_recording(&mut self) -> Result<(), CollaboratorError>;
    fn stop_recording(&mut self) -> Result<(), CollaboratorError>;
    fn is_recording(&self) -> bool;
}

/// Tracker stand-in for sessions without eye-tracking hardware.
#[derive(Debug, Default)]
pub struct DummyTracker {
    recording: bool,
}

impl DummyTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tracker for DummyTracker {
    fn send_message(&mut self, msg: &str) -> Result<(), CollaboratorError> {
        debug!(target: "glare::tracker", "{msg}");
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), CollaboratorError> {
        debug!(target: "glare::tracker", "start recording");
        self.recording = true;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CollaboratorError> {
        debug!(target: "glare::tracker", "stop recording");
        self.recording = false;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.recording
    }
}
