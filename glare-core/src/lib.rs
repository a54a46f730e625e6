pub mod calibration;
pub mod key;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use calibration::{CalibrationState, Position, StimulusLayout};
pub use key::{ABORT_KEYS, Key, KeyEvent, KeyPress, KeyState, ParseKeyError};
pub use phase::{Phase, PhaseKind};
pub use stimulus::{Condition, ConditionEntry, Side, StimulusId};
pub use trial::{
    BlockSummary, Classification, Judgment, JudgmentTally, Response, ResponseKind, SideRates,
    TrialOutcome, TrialSpec, TrialState,
};
