use serde::{Deserialize, Serialize};
use std::fmt;

/// Visual handles the presentation layer knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StimulusId {
    Fixation,
    Glare,
    Nonglare,
    Iso,
    White,
    Black,
    DistractorPlus,
    DistractorCross,
    /// Positioning-phase copies of the nonglare stimulus.
    NonglareLeft,
    NonglareRight,
}

impl StimulusId {
    pub const ALL: [StimulusId; 10] = [
        StimulusId::Fixation,
        StimulusId::Glare,
        StimulusId::Nonglare,
        StimulusId::Iso,
        StimulusId::White,
        StimulusId::Black,
        StimulusId::DistractorPlus,
        StimulusId::DistractorCross,
        StimulusId::NonglareLeft,
        StimulusId::NonglareRight,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StimulusId::Fixation => "fixation",
            StimulusId::Glare => "glare_stimulus",
            StimulusId::Nonglare => "nonglare_stimulus",
            StimulusId::Iso => "iso_stimulus",
            StimulusId::White => "white_stimulus",
            StimulusId::Black => "black_stimulus",
            StimulusId::DistractorPlus => "distractor_plus_stimulus",
            StimulusId::DistractorCross => "distractor_cross_stimulus",
            StimulusId::NonglareLeft => "nonglare_left",
            StimulusId::NonglareRight => "nonglare_right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Numeric code used in the block audit dump (0 = left; 1 = right).
    pub fn code(self) -> u8 {
        match self {
            Side::Left => 0,
            Side::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

/// Experimental category of a trial's stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Glare,
    Nonglare,
    Iso,
    White,
    DistractorPlus,
    DistractorCross,
    GlareVsNonglare,
    GlareVsIso,
    NonglareVsIso,
    Afterimage,
    Blank,
}

/// Static dispatch row for a condition.
///
/// `stimuli[0]` is placed at the trial's assigned side, `stimuli[1]` (paired
/// brightness conditions only) at the mirrored side.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEntry {
    pub name: &'static str,
    pub draw_message: &'static str,
    pub stimuli: &'static [StimulusId],
    pub target: bool,
}

impl Condition {
    pub fn entry(self) -> ConditionEntry {
        use StimulusId as S;
        let (name, draw_message, stimuli, target): (_, _, &'static [StimulusId], _) = match self {
            Condition::Glare => ("Glare", "Draw Glare Stimulus", &[S::Glare], false),
            Condition::Nonglare => ("Nonglare", "Draw Nonglare Stimulus", &[S::Nonglare], false),
            Condition::Iso => ("Iso", "Draw Iso Stimulus", &[S::Iso], false),
            Condition::White => ("White", "Draw White Stimulus", &[S::White], false),
            Condition::DistractorPlus => (
                "Distractor Plus",
                "Draw Distractor Plus Stimulus",
                &[S::DistractorPlus],
                true,
            ),
            Condition::DistractorCross => (
                "Distractor Cross",
                "Draw Distractor Cross Stimulus",
                &[S::DistractorCross],
                true,
            ),
            Condition::GlareVsNonglare => (
                "Glare vs Nonglare",
                "Draw Glare vs Nonglare Stimulus",
                &[S::Glare, S::Nonglare],
                false,
            ),
            Condition::GlareVsIso => (
                "Glare vs Iso",
                "Draw Glare vs Iso Stimulus",
                &[S::Glare, S::Iso],
                false,
            ),
            Condition::NonglareVsIso => (
                "Nonglare vs Iso",
                "Draw Nonglare vs Iso Stimulus",
                &[S::Iso, S::Nonglare],
                false,
            ),
            Condition::Afterimage => ("Stimulus", "Draw Stimulus", &[S::Black], true),
            Condition::Blank => ("Blank", "Draw Blank Stimulus", &[], false),
        };
        ConditionEntry {
            name,
            draw_message,
            stimuli,
            target,
        }
    }

    pub fn name(self) -> &'static str {
        self.entry().name
    }

    pub fn draw_message(self) -> &'static str {
        self.entry().draw_message
    }

    pub fn stimuli(self) -> &'static [StimulusId] {
        self.entry().stimuli
    }

    /// Whether a press on this condition counts as a detection hit.
    pub fn is_target(self) -> bool {
        self.entry().target
    }

    pub fn is_distractor(self) -> bool {
        matches!(self, Condition::DistractorPlus | Condition::DistractorCross)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paired_conditions_draw_two_stimuli() {
        assert_eq!(
            Condition::NonglareVsIso.stimuli(),
            &[StimulusId::Iso, StimulusId::Nonglare]
        );
        assert_eq!(Condition::Glare.stimuli().len(), 1);
        assert!(Condition::Blank.stimuli().is_empty());
    }

    #[test]
    fn targets_are_distractors_and_afterimage_stimuli() {
        assert!(Condition::DistractorPlus.is_target());
        assert!(Condition::Afterimage.is_target());
        assert!(!Condition::Blank.is_target());
        assert!(!Condition::Glare.is_target());
        assert_eq!(Side::Left.opposite(), Side::Right);
    }
}
