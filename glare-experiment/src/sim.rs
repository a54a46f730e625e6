//! In-memory collaborators for headless runs, tests and benchmarks.
//!
//! The simulated display advances a [`ManualTimer`] by one frame on every
//! refresh, so a whole session runs in virtual time. Scripted keys are
//! delivered against that same clock.

use crate::collab::{Background, KeySource, Presenter, Tracker};
use crate::error::CollaboratorError;
use crate::session::Collaborators;
use glare_core::{Key, KeyEvent, Position, StimulusId};
use glare_timing::{ManualTimer, Timer};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::io::{self, Write};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of what the simulated display currently presents.
#[derive(Debug, Default)]
pub struct SimScene {
    pub visible: BTreeMap<StimulusId, Position>,
    pub message: Option<String>,
    pub background: Background,
    pub refreshes: usize,
    /// Every `show` call, in order.
    pub onsets: Vec<(StimulusId, Position)>,
}

pub struct SimDisplay {
    clock: ManualTimer,
    frame: Duration,
    scene: Rc<RefCell<SimScene>>,
}

impl SimDisplay {
    pub fn new(clock: ManualTimer, frame: Duration) -> Self {
        Self {
            clock,
            frame,
            scene: Rc::default(),
        }
    }

    pub fn scene(&self) -> Rc<RefCell<SimScene>> {
        self.scene.clone()
    }
}

impl Presenter for SimDisplay {
    fn show(&mut self, id: StimulusId, at: Position) {
        let mut scene = self.scene.borrow_mut();
        scene.visible.insert(id, at);
        scene.onsets.push((id, at));
    }

    fn hide(&mut self, id: StimulusId) {
        self.scene.borrow_mut().visible.remove(&id);
    }

    fn message(&mut self, text: Option<&str>) {
        self.scene.borrow_mut().message = text.map(str::to_owned);
    }

    fn set_background(&mut self, background: Background) {
        self.scene.borrow_mut().background = background;
    }

    fn refresh(&mut self) -> Result<(), CollaboratorError> {
        self.clock.advance(self.frame);
        self.scene.borrow_mut().refreshes += 1;
        Ok(())
    }
}

/// One tap in a headless key script, `after_ms` after the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScriptedTap {
    pub after_ms: u64,
    pub key: Key,
}

#[derive(Debug, Clone, Copy)]
struct ScriptStep {
    delay: Duration,
    event: KeyEvent,
}

/// Key source replaying a fixed script against the simulated clock.
///
/// Each step's delay is measured from the delivery of the previous step.
/// At most one event is delivered per drain. Once the script is spent and
/// nothing has been delivered for the idle limit, draining fails with
/// [`CollaboratorError::InputExhausted`] so a run waiting on a key that will
/// never come terminates.
pub struct ScriptedKeys {
    clock: ManualTimer,
    steps: VecDeque<ScriptStep>,
    last: Duration,
    idle_limit: Duration,
}

impl ScriptedKeys {
    pub fn new(clock: ManualTimer) -> Self {
        let last = clock.now();
        Self {
            clock,
            steps: VecDeque::new(),
            last,
            idle_limit: Duration::from_secs(900),
        }
    }

    pub fn from_taps(clock: ManualTimer, taps: &[ScriptedTap]) -> Self {
        taps.iter().fold(Self::new(clock), |keys, tap| {
            keys.tap(Duration::from_millis(tap.after_ms), tap.key)
        })
    }

    pub fn push(mut self, delay: Duration, event: KeyEvent) -> Self {
        self.steps.push_back(ScriptStep { delay, event });
        self
    }

    /// Press followed by an immediate release.
    pub fn tap(self, delay: Duration, key: Key) -> Self {
        self.push(delay, KeyEvent::pressed(key))
            .push(Duration::ZERO, KeyEvent::released(key))
    }

    pub fn with_idle_limit(mut self, limit: Duration) -> Self {
        self.idle_limit = limit;
        self
    }

    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl KeySource for ScriptedKeys {
    fn drain(&mut self) -> Result<Vec<KeyEvent>, CollaboratorError> {
        let now = self.clock.now();
        match self.steps.front() {
            Some(step) if now >= self.last + step.delay => {
                let event = step.event;
                self.steps.pop_front();
                self.last = now;
                Ok(vec![event])
            }
            Some(_) => Ok(Vec::new()),
            None if now.saturating_sub(self.last) > self.idle_limit => {
                Err(CollaboratorError::InputExhausted)
            }
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Default)]
struct TrackerLog {
    messages: Vec<String>,
    recording: bool,
    starts: usize,
    stops: usize,
}

/// Tracker that keeps everything it was sent. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingTracker {
    inner: Rc<RefCell<TrackerLog>>,
}

impl RecordingTracker {
    pub fn messages(&self) -> Vec<String> {
        self.inner.borrow().messages.clone()
    }

    pub fn recording_starts(&self) -> usize {
        self.inner.borrow().starts
    }

    pub fn recording_stops(&self) -> usize {
        self.inner.borrow().stops
    }
}

impl Tracker for RecordingTracker {
    fn send_message(&mut self, msg: &str) -> Result<(), CollaboratorError> {
        self.inner.borrow_mut().messages.push(msg.to_owned());
        Ok(())
    }

    fn start_recording(&mut self) -> Result<(), CollaboratorError> {
        let mut log = self.inner.borrow_mut();
        log.recording = true;
        log.starts += 1;
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), CollaboratorError> {
        let mut log = self.inner.borrow_mut();
        log.recording = false;
        log.stops += 1;
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.inner.borrow().recording
    }
}

/// In-memory log sink. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Rc<RefCell<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.borrow()).into_owned()
    }

    /// Messages of the logged events, without their timestamps.
    pub fn messages(&self) -> Vec<String> {
        self.contents()
            .lines()
            .filter_map(|line| line.split_once("\tEXP \t").map(|(_, msg)| msg.to_owned()))
            .collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Observation handles into a simulated session.
#[derive(Clone)]
pub struct SimHandles {
    pub clock: ManualTimer,
    pub scene: Rc<RefCell<SimScene>>,
    pub tracker: RecordingTracker,
    pub log: SharedBuffer,
}

/// Wires a fully simulated collaborator set around `clock`.
pub fn sim_collaborators(
    clock: ManualTimer,
    frame: Duration,
    keys: ScriptedKeys,
) -> (Collaborators, SimHandles) {
    let display = SimDisplay::new(clock.clone(), frame);
    let handles = SimHandles {
        clock: clock.clone(),
        scene: display.scene(),
        tracker: RecordingTracker::default(),
        log: SharedBuffer::default(),
    };
    let timer: Arc<dyn Timer> = Arc::new(clock);
    let collab = Collaborators {
        timer,
        presenter: Box::new(display),
        keys: Box::new(keys),
        tracker: Box::new(handles.tracker.clone()),
        log_sink: Box::new(handles.log.clone()),
    };
    (collab, handles)
}
