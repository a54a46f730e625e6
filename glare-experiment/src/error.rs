use glare_core::{Condition, Key};
use thiserror::Error;

/// Fail-fast configuration problems, detected before any block starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{condition} count {count} must be even to balance left/right sides")]
    OddBalancedCount { condition: Condition, count: usize },

    #[error("condition {0} is listed more than once in a block")]
    DuplicateCondition(Condition),

    #[error("{phase} block has no trials configured")]
    EmptyBlock { phase: &'static str },

    #[error("interval range min {min}s exceeds max {max}s")]
    InvalidInterval { min: u64, max: u64 },

    #[error("{name} must be a positive, finite number of seconds (got {value})")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("invalid calibration offset ({x}, {y})")]
    InvalidCalibration { x: f32, y: f32 },

    #[error("positioning is skipped but no initial calibration was supplied")]
    MissingCalibration,

    #[error("positioning step must be positive and finite (got {0})")]
    InvalidStep(f32),

    #[error("maximum block count must be at least 1")]
    NoBlocks,

    #[error("side sequence for {condition} exhausted after {len} trials")]
    SideSequenceExhausted { condition: Condition, len: usize },
}

/// Failures surfaced by the presentation, input, tracker or log collaborators.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("presentation window was closed")]
    DisplayClosed,

    #[error("presentation failure: {0}")]
    Display(String),

    #[error("tracker link failure: {0}")]
    Tracker(String),

    #[error("scripted input exhausted")]
    InputExhausted,

    #[error("event log write failed")]
    Log(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("run aborted by operator key `{key}`")]
    Aborted { key: Key },

    #[error("collaborator failure: {0}")]
    Collaborator(#[from] CollaboratorError),
}

impl ExperimentError {
    pub fn is_abort(&self) -> bool {
        matches!(self, ExperimentError::Aborted { .. })
    }
}

pub type Result<T, E = ExperimentError> = std::result::Result<T, E>;
