use crate::block::{BlockController, BlockTask, LayoutSource};
use crate::config::{ButtonMapping, MainConfig, PositioningConfig, secs};
use crate::error::Result;
use crate::phases::positioning;
use crate::session::Session;
use crate::trial::{ResponseRule, StimulusWindow, TrialPlan};
use glare_core::{BlockSummary, CalibrationState, Condition, PhaseKind, Position, StimulusId};

const INTRO: &str = "In this part images will appear to the left or right of the central dot.\n\n\
    Keep your eyes on the dot at all times.\n\n\
    Press SPACE to see the images.";

/// Where each stimulus sits on the instruction preview screen.
const PREVIEW: [(StimulusId, Position); 6] = [
    (StimulusId::Glare, Position::new(-12.0, 5.0)),
    (StimulusId::Nonglare, Position::new(0.0, 5.0)),
    (StimulusId::Iso, Position::new(12.0, 5.0)),
    (StimulusId::White, Position::new(-12.0, -5.0)),
    (StimulusId::DistractorPlus, Position::new(0.0, -5.0)),
    (StimulusId::DistractorCross, Position::new(12.0, -5.0)),
];

fn button_text(mapping: ButtonMapping) -> String {
    let key = |c| {
        mapping
            .key_for(c)
            .map(|k| k.to_string())
            .unwrap_or_default()
    };
    format!(
        "Most images are just there to be looked at.\n\n\
         When you see a PLUS, press {}.\nWhen you see a CROSS, press {}.\n\n\
         Press SPACE to continue.",
        key(Condition::DistractorPlus),
        key(Condition::DistractorCross)
    )
}

pub fn run(
    session: &mut Session,
    controller: &mut BlockController,
    cfg: &MainConfig,
    positioning_cfg: &PositioningConfig,
    calibration: &mut CalibrationState,
    summaries: &mut Vec<BlockSummary>,
) -> Result<()> {
    session.event(&format!("Button Condition: {}", cfg.button_mapping.number()))?;

    session.instruction(INTRO)?;
    for (id, at) in PREVIEW {
        session.show(id, at);
    }
    session.instruction("These are the images you will see.\n\nPress SPACE to continue.")?;
    for (id, _) in PREVIEW {
        session.hide(id);
    }
    session.instruction(&button_text(cfg.button_mapping))?;

    let task = BlockTask {
        phase: PhaseKind::Main,
        counts: cfg.counts.clone(),
        pre: cfg.isi,
        post: cfg.isi,
        plan: TrialPlan {
            stimulus: StimulusWindow::Timed(secs("main.stimulus_secs", cfg.stimulus_secs)?),
            rule: ResponseRule::Detection {
                mapping: cfg.button_mapping,
            },
            fixation: true,
            prompt: None,
        },
    };
    let mut reposition =
        |s: &mut Session, current: CalibrationState| positioning::run(s, positioning_cfg, current);

    controller.run_blocks(
        session,
        &task,
        LayoutSource::Calibrated(calibration),
        &mut reposition,
        summaries,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_text_follows_the_mapping() {
        let text = button_text(ButtonMapping::CrossFirst);
        assert!(text.contains("PLUS, press 2"));
        assert!(text.contains("CROSS, press 1"));
        assert!(button_text(ButtonMapping::PlusFirst).contains("PLUS, press 1"));
    }
}
