use crate::calibration::Position;
use crate::key::Key;
use crate::phase::PhaseKind;
use crate::stimulus::{Condition, Side};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trial state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    PreWait,
    StimulusOn,
    ResponseWindow,
    StimulusOff,
    PostWait,
    Done,
    Aborted,
}

/// One scheduled trial. Built at block start, consumed exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub index: usize,
    pub condition: Condition,
    pub side: Side,
    pub pre_interval: Duration,
    pub post_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Hit,
    FalseAlarm,
    None,
}

/// Three-way brightness judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judgment {
    LeftBrighter,
    RightBrighter,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Perceived,
    FalseAlarm,
    /// Press after the first classified one in the same window.
    Repeat,
    Judgment(Judgment),
    Onset,
    Offset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub key: Key,
    /// Seconds since stimulus onset.
    pub at_secs: f64,
    pub kind: ResponseKind,
}

/// Recorded result per completed trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialOutcome {
    pub index: usize,
    pub condition: Condition,
    pub side: Side,
    /// Where the primary stimulus was drawn.
    pub position: Position,
    pub responses: Vec<Response>,
    pub classification: Classification,
    pub judgment: Option<Judgment>,
    pub correct_button: Option<bool>,
    pub pre_wait_secs: f64,
    pub stimulus_secs: f64,
    pub post_wait_secs: f64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideRates {
    pub left_hits: usize,
    pub left_targets: usize,
    pub right_hits: usize,
    pub right_targets: usize,
}

impl SideRates {
    pub fn rate(&self, side: Side) -> f64 {
        let (hits, targets) = match side {
            Side::Left => (self.left_hits, self.left_targets),
            Side::Right => (self.right_hits, self.right_targets),
        };
        if targets == 0 {
            0.0
        } else {
            hits as f64 / targets as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentTally {
    pub left_brighter: usize,
    pub right_brighter: usize,
    pub same: usize,
}

/// Aggregates of a finished block. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub phase: PhaseKind,
    pub block: usize,
    pub outcomes: Vec<TrialOutcome>,
    pub rates: SideRates,
    pub false_alarms: usize,
    pub judgments: JudgmentTally,
    pub duration_secs: f64,
}

impl BlockSummary {
    pub fn from_outcomes(
        phase: PhaseKind,
        block: usize,
        outcomes: Vec<TrialOutcome>,
        duration_secs: f64,
    ) -> Self {
        let mut rates = SideRates::default();
        let mut judgments = JudgmentTally::default();
        let mut false_alarms = 0;

        for outcome in &outcomes {
            if outcome.condition.is_target() {
                let hit = outcome.classification == Classification::Hit;
                match outcome.side {
                    Side::Left => {
                        rates.left_targets += 1;
                        rates.left_hits += hit as usize;
                    }
                    Side::Right => {
                        rates.right_targets += 1;
                        rates.right_hits += hit as usize;
                    }
                }
            }
            if outcome.classification == Classification::FalseAlarm {
                false_alarms += 1;
            }
            match outcome.judgment {
                Some(Judgment::LeftBrighter) => judgments.left_brighter += 1,
                Some(Judgment::RightBrighter) => judgments.right_brighter += 1,
                Some(Judgment::Same) => judgments.same += 1,
                None => {}
            }
        }

        Self {
            phase,
            block,
            outcomes,
            rates,
            false_alarms,
            judgments,
            duration_secs,
        }
    }

    pub fn detection_rate(&self, side: Side) -> f64 {
        self.rates.rate(side)
    }

    pub fn trial_count(&self) -> usize {
        self.outcomes.len()
    }

    /// Sides tallied per condition, in (left, right) order.
    pub fn side_tally(&self, condition: Condition) -> (usize, usize) {
        self.outcomes
            .iter()
            .filter(|o| o.condition == condition)
            .fold((0, 0), |(l, r), o| match o.side {
                Side::Left => (l + 1, r),
                Side::Right => (l, r + 1),
            })
    }
}
