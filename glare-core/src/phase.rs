use serde::{Deserialize, Serialize};

/// Defines experiment phases and behavior
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn next(&self) -> Option<Self>;
    fn label(&self) -> &'static str;

    /// Whether trials in this phase are placed from the shared calibration.
    fn uses_calibration(&self) -> bool {
        false
    }

    /// Whether the block break screen offers the repositioning affordance.
    fn offers_reposition(&self) -> bool {
        false
    }

    fn runs_blocks(&self) -> bool {
        true
    }
}

#[derive(Copy, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Positioning,
    Main,
    Brightness,
    Afterimage,
}

impl Default for PhaseKind {
    fn default() -> Self {
        PhaseKind::Positioning
    }
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 4] = [
        PhaseKind::Positioning,
        PhaseKind::Main,
        PhaseKind::Brightness,
        PhaseKind::Afterimage,
    ];
}

impl Phase for PhaseKind {
    fn next(&self) -> Option<Self> {
        use PhaseKind::*;
        Some(match self {
            Positioning => Main,
            Main => Brightness,
            Brightness => Afterimage,
            Afterimage => return None,
        })
    }

    fn label(&self) -> &'static str {
        match self {
            PhaseKind::Positioning => "Stimulus Location Positioning Phase",
            PhaseKind::Main => "Glare Illusion Main Phase",
            PhaseKind::Brightness => "Brightness Perception Phase",
            PhaseKind::Afterimage => "Afterimage Perception Phase",
        }
    }

    fn uses_calibration(&self) -> bool {
        matches!(self, PhaseKind::Main | PhaseKind::Afterimage)
    }

    fn offers_reposition(&self) -> bool {
        matches!(self, PhaseKind::Main)
    }

    fn runs_blocks(&self) -> bool {
        !matches!(self, PhaseKind::Positioning)
    }
}
