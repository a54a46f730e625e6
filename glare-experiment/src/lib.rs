//! Trial and block scheduling engine for the glare-illusion perception
//! experiment.
//!
//! The engine drives four phases (positioning, main detection task,
//! brightness judgments, afterimage reports) through a single-threaded
//! tick loop. Presentation, key input and the eye-tracker link are
//! collaborators behind traits in [`collab`]; [`sim`] provides in-memory
//! versions for headless runs and tests.

pub mod block;
pub mod collab;
pub mod config;
pub mod error;
pub mod event_log;
pub mod input;
pub mod orchestrator;
pub mod phases;
pub mod sequence;
pub mod session;
pub mod sim;
pub mod trial;

pub use block::{BlockController, BlockDecision, BlockTask, LayoutSource};
pub use collab::{Background, DummyTracker, KeySource, Presenter, Tracker};
pub use config::{
    AfterimageConfig, BrightnessConfig, ButtonMapping, DemoTiming, ExperimentConfig, MainConfig,
    PositioningConfig, SkipFlags,
};
pub use error::{CollaboratorError, ConfigError, ExperimentError, Result};
pub use event_log::EventLog;
pub use input::InputPoller;
pub use orchestrator::{Experiment, RunReport};
pub use sequence::{BlockSchedule, ConditionCount, IntervalRange, SequenceGenerator, SideSequence};
pub use session::{Collaborators, Session};
pub use trial::{ResponseRule, StimulusWindow, TrialPlan, TrialRunner};
