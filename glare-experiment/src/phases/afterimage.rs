use crate::block::{BlockController, BlockTask, LayoutSource};
use crate::collab::Background;
use crate::config::{AfterimageConfig, DemoTiming, secs};
use crate::error::Result;
use crate::sequence::IntervalRange;
use crate::session::Session;
use crate::trial::{ResponseRule, StimulusWindow, TrialPlan};
use glare_core::{BlockSummary, CalibrationState, Key, PhaseKind, Position, StimulusId};
use std::time::Duration;

const INTRO: &str = "In this part a dark image will appear and then disappear.\n\n\
    After it disappears you may see a faint afterimage.\n\n\
    Press SPACE to see an example.";

const DEMO_HINT: &str = "Press SPACE when you are ready to continue.";

const BLOCK_INTRO: &str = "After each image disappears:\n\n\
    Press 1 when an afterimage appears.\nPress 2 when it fades away.\n\n\
    Press SPACE to continue.";

pub fn run(
    session: &mut Session,
    controller: &mut BlockController,
    cfg: &AfterimageConfig,
    calibration: &mut CalibrationState,
    summaries: &mut Vec<BlockSummary>,
) -> Result<()> {
    session.set_background(Background::White);
    session.instruction(INTRO)?;
    demo(session, &cfg.demo)?;
    session.instruction(BLOCK_INTRO)?;

    let task = BlockTask {
        phase: PhaseKind::Afterimage,
        counts: cfg.counts.clone(),
        pre: IntervalRange::fixed(cfg.pre_secs),
        post: IntervalRange::fixed(cfg.report_secs),
        plan: TrialPlan {
            stimulus: StimulusWindow::Timed(secs("afterimage.stimulus_secs", cfg.stimulus_secs)?),
            rule: ResponseRule::AfterimageReport,
            fixation: true,
            prompt: None,
        },
    };

    controller.run_blocks(
        session,
        &task,
        LayoutSource::Calibrated(calibration),
        &mut |_, current| Ok(current),
        summaries,
    )?;
    session.set_background(Background::Gray);
    Ok(())
}

/// Fixation, then the black stimulus at centre, then a blank screen; repeated
/// until space is pressed while the stimulus is on or off.
fn demo(session: &mut Session, timing: &DemoTiming) -> Result<()> {
    let fixation = secs("afterimage.demo.fixation_secs", timing.fixation_secs)?;
    let on = secs("afterimage.demo.on_secs", timing.on_secs)?;
    let off = secs("afterimage.demo.off_secs", timing.off_secs)?;

    session.event("Afterimage demonstration")?;
    session.clear_input()?;
    loop {
        session.show(StimulusId::Fixation, Position::CENTER);
        session.wait(fixation, &[])?;
        session.hide(StimulusId::Fixation);

        session.show(StimulusId::Black, Position::CENTER);
        let done = space_within(session, on)?;
        session.hide(StimulusId::Black);
        session.message(Some(DEMO_HINT));
        if done || space_within(session, off)? {
            break;
        }
        session.message(None);
    }
    session.message(None);
    session.event("Afterimage demonstration finished")
}

fn space_within(session: &mut Session, window: Duration) -> Result<bool> {
    let watch = session.stopwatch();
    while watch.elapsed() < window {
        if !session.tick(&[Key::Space])?.is_empty() {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedKeys, sim_collaborators};
    use glare_timing::{ManualTimer, Timer};

    #[test]
    fn demo_repeats_until_space() {
        let clock = ManualTimer::new();
        // first cycle is 13s long; space lands 2s into the second stimulus
        let keys = ScriptedKeys::new(clock.clone()).tap(Duration::from_secs(16), Key::Space);
        let (collab, handles) = sim_collaborators(clock.clone(), Duration::from_millis(5), keys);
        let mut session = Session::new(collab);

        demo(&mut session, &DemoTiming::default()).unwrap();

        let onsets = handles
            .scene
            .borrow()
            .onsets
            .iter()
            .filter(|(id, _)| *id == StimulusId::Black)
            .count();
        assert_eq!(onsets, 2);
        assert!(clock.now() >= Duration::from_secs(16));
        assert!(handles.scene.borrow().visible.is_empty());
    }
}
