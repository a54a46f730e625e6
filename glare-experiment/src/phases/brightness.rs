use crate::block::{BlockController, BlockTask, LayoutSource};
use crate::config::BrightnessConfig;
use crate::error::Result;
use crate::sequence::IntervalRange;
use crate::session::Session;
use crate::trial::{ResponseRule, StimulusWindow, TrialPlan};
use glare_core::{BlockSummary, PhaseKind, Position, StimulusId, StimulusLayout};

const INTRO: &str = "In this part two images will appear, one on each side of the central dot.\n\n\
    Decide which image looks brighter at its center.\n\n\
    Press SPACE to continue.";

/// The three compared stimuli, side by side on the instruction screen.
const PREVIEW: [(StimulusId, Position); 3] = [
    (StimulusId::Glare, Position::new(-12.0, 0.0)),
    (StimulusId::Nonglare, Position::new(0.0, 0.0)),
    (StimulusId::Iso, Position::new(12.0, 0.0)),
];

const PROMPT: &str = "Which image is brighter at its center?\n\n\
    1 = Left image\n2 = Right image\n3 = Same brightness";

/// Three-way brightness judgments on a fixed mirrored layout. The shared
/// calibration is neither read nor offered for adjustment here.
pub fn run(
    session: &mut Session,
    controller: &mut BlockController,
    cfg: &BrightnessConfig,
    summaries: &mut Vec<BlockSummary>,
) -> Result<()> {
    introduce(session)?;

    let task = BlockTask {
        phase: PhaseKind::Brightness,
        counts: cfg.counts.clone(),
        pre: IntervalRange::fixed(cfg.pre_secs),
        post: IntervalRange::fixed(0),
        plan: TrialPlan {
            stimulus: StimulusWindow::UntilResponse,
            rule: ResponseRule::ForcedChoice,
            fixation: true,
            prompt: Some(PROMPT),
        },
    };
    let layout = StimulusLayout::mirrored(cfg.layout_x, cfg.layout_y);

    controller.run_blocks(
        session,
        &task,
        LayoutSource::Fixed(layout),
        &mut |_, current| Ok(current),
        summaries,
    )
}

fn introduce(session: &mut Session) -> Result<()> {
    session.instruction(INTRO)?;
    for (id, at) in PREVIEW {
        session.show(id, at);
    }
    session.instruction("These are the images you will compare.\n\nPress SPACE to continue.")?;
    for (id, _) in PREVIEW {
        session.hide(id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedKeys, sim_collaborators};
    use glare_core::Key;
    use glare_timing::{ManualTimer, Timer};
    use std::time::Duration;

    #[test]
    fn intro_previews_the_compared_stimuli_until_space() {
        let clock = ManualTimer::new();
        let keys = ScriptedKeys::new(clock.clone())
            .tap(Duration::from_millis(100), Key::Space)
            .tap(Duration::from_millis(100), Key::Space);
        let (collab, handles) = sim_collaborators(clock.clone(), Duration::from_millis(1), keys);
        let mut session = Session::new(collab);

        introduce(&mut session).unwrap();

        let scene = handles.scene.borrow();
        assert_eq!(scene.onsets, PREVIEW.to_vec());
        assert!(scene.visible.is_empty());
        assert_eq!(scene.message, None);
        assert!(clock.now() >= Duration::from_millis(200));
    }
}
