use crate::error::Result;
use crate::sequence::{ConditionCount, IntervalRange, SequenceGenerator};
use crate::session::Session;
use crate::trial::{TrialPlan, TrialRunner};
use glare_core::{
    BlockSummary, CalibrationState, Key, Phase, PhaseKind, Side, StimulusId, StimulusLayout,
};
use tracing::info;

/// Operator choice on the break screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockDecision {
    Continue,
    NextPhase,
    /// Redo stimulus positioning, then continue.
    Reposition,
}

/// What one phase's blocks consist of.
#[derive(Debug, Clone)]
pub struct BlockTask {
    pub phase: PhaseKind,
    pub counts: Vec<ConditionCount>,
    pub pre: IntervalRange,
    pub post: IntervalRange,
    pub plan: TrialPlan,
}

/// Where a phase takes its left/right positions from.
pub enum LayoutSource<'a> {
    /// Follows the shared calibration; recomputed before every block.
    Calibrated(&'a mut CalibrationState),
    Fixed(StimulusLayout),
}

impl LayoutSource<'_> {
    pub fn layout(&self) -> StimulusLayout {
        match self {
            LayoutSource::Calibrated(c) => c.layout(),
            LayoutSource::Fixed(layout) => *layout,
        }
    }
}

pub type Reposition<'a> = dyn FnMut(&mut Session, CalibrationState) -> Result<CalibrationState> + 'a;

pub struct BlockController {
    generator: SequenceGenerator,
    max_blocks: usize,
}

impl BlockController {
    pub fn new(generator: SequenceGenerator, max_blocks: usize) -> Self {
        Self {
            generator,
            max_blocks,
        }
    }

    pub fn max_blocks(&self) -> usize {
        self.max_blocks
    }

    /// Runs one block: schedule, start trigger, every trial in schedule
    /// order, then the block aggregates.
    pub fn run_block(
        &mut self,
        session: &mut Session,
        task: &BlockTask,
        block: usize,
        layout: &StimulusLayout,
    ) -> Result<BlockSummary> {
        let schedule = self.generator.generate(&task.counts, task.pre, task.post)?;

        session.instruction(&format!("Are you ready to start Block {block}?"))?;
        session.start_trigger()?;

        let watch = session.stopwatch();
        session.event(&format!("Block #{block}"))?;
        session.event(&format!("Right Stimulus Location: {}", layout.right))?;
        session.event(&format!("Left Stimulus Location: {}", layout.left))?;
        for line in schedule.audit_lines() {
            session.note(&line)?;
        }

        let mut runner = TrialRunner::new(task.plan);
        let mut outcomes = Vec::with_capacity(schedule.len());
        for spec in schedule.trial_specs() {
            outcomes.push(runner.run(session, spec, layout)?);
        }
        session.hide(StimulusId::Fixation);

        let summary = BlockSummary::from_outcomes(task.phase, block, outcomes, watch.elapsed_secs());
        log_summary(session, &summary)?;
        Ok(summary)
    }

    /// Break screen; blocks until the operator picks one of the offered
    /// affordances. After the last allowed block the screen is still shown,
    /// but any answer ends the phase.
    pub fn await_decision(
        &mut self,
        session: &mut Session,
        summary: &BlockSummary,
    ) -> Result<BlockDecision> {
        let last = summary.block >= self.max_blocks;
        let mut keys = vec![Key::Space, Key::Char('b')];
        if summary.phase.offers_reposition() && !last {
            keys.push(Key::Char('l'));
        }

        session.message(Some(&break_text(summary, last)));
        session.clear_input()?;
        let press = session.wait_for_keys(&keys)?;
        session.message(None);

        let decision = match press.key {
            _ if last => BlockDecision::NextPhase,
            Key::Char('b') => BlockDecision::NextPhase,
            Key::Char('l') => BlockDecision::Reposition,
            _ => BlockDecision::Continue,
        };
        info!(?decision, block = summary.block, "break screen");
        Ok(decision)
    }

    /// Block loop for one phase. Summaries are appended as blocks finish so
    /// they survive an abort in a later block.
    pub fn run_blocks(
        &mut self,
        session: &mut Session,
        task: &BlockTask,
        mut layout: LayoutSource<'_>,
        reposition: &mut Reposition<'_>,
        summaries: &mut Vec<BlockSummary>,
    ) -> Result<()> {
        for block in 1..=self.max_blocks {
            let current = layout.layout();
            let summary = self.run_block(session, task, block, &current)?;
            if block == self.max_blocks {
                session.event("Maximum block count reached")?;
            }
            let decision = self.await_decision(session, &summary);
            summaries.push(summary);
            let decision = decision?;

            match (decision, &mut layout) {
                (BlockDecision::NextPhase, _) => break,
                (BlockDecision::Reposition, LayoutSource::Calibrated(calibration)) => {
                    session.event("Redo stimulus positioning")?;
                    **calibration = reposition(session, **calibration)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn log_summary(session: &mut Session, summary: &BlockSummary) -> Result<()> {
    session.event(&format!("Block duration: {:.3}", summary.duration_secs))?;
    match summary.phase {
        PhaseKind::Brightness => {
            let j = summary.judgments;
            session.event(&format!(
                "Block Perception Answers: left brighter {}, right brighter {}, same {}",
                j.left_brighter, j.right_brighter, j.same
            ))?;
        }
        PhaseKind::Afterimage => {
            session.event(&format!(
                "Right afterimage perception rate: {:.2}",
                summary.detection_rate(Side::Right)
            ))?;
            session.event(&format!(
                "Left afterimage perception rate: {:.2}",
                summary.detection_rate(Side::Left)
            ))?;
            session.event(&format!("Blank false alarms: {}", summary.false_alarms))?;
        }
        _ => {
            session.event(&format!(
                "Right distractor perception rate: {:.2}",
                summary.detection_rate(Side::Right)
            ))?;
            session.event(&format!(
                "Left distractor perception rate: {:.2}",
                summary.detection_rate(Side::Left)
            ))?;
            session.event(&format!("False alarms: {}", summary.false_alarms))?;
        }
    }
    Ok(())
}

fn break_text(summary: &BlockSummary, last: bool) -> String {
    let phase = summary.phase;
    let mut text = format!(
        "Great job! Take a break.\n\nYou completed Block {} in {:.0} seconds.\n",
        summary.block, summary.duration_secs
    );
    match phase {
        PhaseKind::Brightness => {
            let j = summary.judgments;
            text.push_str(&format!(
                "Left brighter: {}  Right brighter: {}  Same: {}\n",
                j.left_brighter, j.right_brighter, j.same
            ));
        }
        _ => {
            text.push_str(&format!(
                "Left detection rate: {:.0}%  Right detection rate: {:.0}%\n",
                summary.detection_rate(Side::Left) * 100.0,
                summary.detection_rate(Side::Right) * 100.0
            ));
        }
    }

    let onward = if phase.next().is_some() {
        "move on to the next part"
    } else {
        "end the experiment"
    };
    if last {
        text.push_str(&format!(
            "\nThis was the last block.\nPress SPACE or B to {onward}.\n"
        ));
        return text;
    }
    text.push_str("\nPress SPACE to continue with the next block.\n");
    text.push_str(&format!("Press B to {onward}.\n"));
    if phase.offers_reposition() {
        text.push_str("Press L to redo the stimulus positioning.\n");
    }
    text
}
