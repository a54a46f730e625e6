//! Per-trial state machine.
//!
//! `PreWait -> StimulusOn -> ResponseWindow -> StimulusOff -> PostWait -> Done`,
//! with `Aborted` reachable from any state. Every wait is a tick loop on the
//! session so abort keys are seen immediately.

use crate::config::ButtonMapping;
use crate::error::Result;
use crate::session::Session;
use glare_core::{
    Classification, Condition, Judgment, Key, KeyPress, Position, Response, ResponseKind,
    StimulusId, StimulusLayout, TrialOutcome, TrialSpec, TrialState,
};
use std::time::Duration;
use tracing::debug;

const DETECTION_KEYS: [Key; 2] = [Key::Char('1'), Key::Char('2')];
const JUDGMENT_KEYS: [Key; 3] = [Key::Char('1'), Key::Char('2'), Key::Char('3')];
const REPORT_KEYS: [Key; 2] = [Key::Char('1'), Key::Char('2')];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StimulusWindow {
    Timed(Duration),
    /// Stimulus stays up until the first qualifying response.
    UntilResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseRule {
    /// `1`/`2` while the stimulus is up; first press classifies the trial.
    Detection { mapping: ButtonMapping },
    /// `1` left brighter, `2` right brighter, `3` same.
    ForcedChoice,
    /// `1` onset, `2` offset, reported during the post-stimulus window.
    AfterimageReport,
}

impl ResponseRule {
    fn window_keys(&self) -> &'static [Key] {
        match self {
            ResponseRule::Detection { .. } => &DETECTION_KEYS,
            ResponseRule::ForcedChoice => &JUDGMENT_KEYS,
            ResponseRule::AfterimageReport => &[],
        }
    }

    fn post_keys(&self) -> &'static [Key] {
        match self {
            ResponseRule::AfterimageReport => &REPORT_KEYS,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialPlan {
    pub stimulus: StimulusWindow,
    pub rule: ResponseRule,
    /// Keep the central fixation point up for the whole trial.
    pub fixation: bool,
    /// Text shown alongside the stimulus.
    pub prompt: Option<&'static str>,
}

#[derive(Debug, Default)]
struct Scoring {
    responses: Vec<Response>,
    classification: Option<Classification>,
    judgment: Option<Judgment>,
    correct_button: Option<bool>,
}

pub struct TrialRunner {
    plan: TrialPlan,
    state: TrialState,
    transitions: Vec<TrialState>,
}

impl TrialRunner {
    pub fn new(plan: TrialPlan) -> Self {
        Self {
            plan,
            state: TrialState::Done,
            transitions: Vec::new(),
        }
    }

    pub fn plan(&self) -> &TrialPlan {
        &self.plan
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    /// States entered by the most recent `run`, in order.
    pub fn transitions(&self) -> &[TrialState] {
        &self.transitions
    }

    fn enter(&mut self, state: TrialState) {
        debug!(?state, "trial state");
        self.state = state;
        self.transitions.push(state);
    }

    /// Runs one trial to completion. On error the trial is marked aborted,
    /// its stimuli are hidden and no outcome is produced.
    pub fn run(
        &mut self,
        session: &mut Session,
        spec: &TrialSpec,
        layout: &StimulusLayout,
    ) -> Result<TrialOutcome> {
        self.transitions.clear();
        match self.run_states(session, spec, layout) {
            Ok(outcome) => {
                self.enter(TrialState::Done);
                Ok(outcome)
            }
            Err(e) => {
                self.enter(TrialState::Aborted);
                for &id in spec.condition.stimuli() {
                    session.hide(id);
                }
                if self.plan.prompt.is_some() {
                    session.message(None);
                }
                Err(e)
            }
        }
    }

    fn run_states(
        &mut self,
        session: &mut Session,
        spec: &TrialSpec,
        layout: &StimulusLayout,
    ) -> Result<TrialOutcome> {
        let trial_watch = session.stopwatch();
        self.enter(TrialState::PreWait);

        session.event(&format!("Starting Trial #{}", spec.index + 1))?;
        session.note(&format!(
            "Trial Pre-Stimulus Time: {}",
            spec.pre_interval.as_secs_f64()
        ))?;
        session.note(&format!(
            "Trial Post-Stimulus Time: {}",
            spec.post_interval.as_secs_f64()
        ))?;
        if self.plan.fixation {
            session.show(StimulusId::Fixation, Position::CENTER);
        }
        session.event("Pre-stimulus interval")?;
        let pre = session.stopwatch();
        session.wait(spec.pre_interval, &[])?;
        let pre_wait_secs = pre.elapsed_secs();

        self.enter(TrialState::StimulusOn);
        let position = layout.position(spec.side);
        let stimuli = spec.condition.stimuli();
        if let Some(&primary) = stimuli.first() {
            session.show(primary, position);
        }
        if let Some(&partner) = stimuli.get(1) {
            session.show(partner, layout.position(spec.side.opposite()));
        }
        if let Some(prompt) = self.plan.prompt {
            session.message(Some(prompt));
        }
        session.event(spec.condition.draw_message())?;
        session.clear_input()?;
        let onset = session.stopwatch();
        let onset_at = onset.started_at();

        self.enter(TrialState::ResponseWindow);
        let mut scoring = Scoring::default();
        let keys = self.plan.rule.window_keys();
        match self.plan.stimulus {
            StimulusWindow::Timed(duration) => {
                while onset.elapsed() < duration {
                    for press in session.tick(keys)? {
                        self.score(session, spec.condition, &mut scoring, press, onset_at)?;
                    }
                }
            }
            StimulusWindow::UntilResponse => {
                while scoring.classification.is_none() && scoring.judgment.is_none() {
                    for press in session.tick(keys)? {
                        self.score(session, spec.condition, &mut scoring, press, onset_at)?;
                    }
                }
            }
        }

        self.enter(TrialState::StimulusOff);
        let stimulus_secs = onset.elapsed_secs();
        for &id in stimuli {
            session.hide(id);
        }
        if self.plan.prompt.is_some() {
            session.message(None);
        }

        self.enter(TrialState::PostWait);
        session.event("Post-stimulus interval")?;
        let post = session.stopwatch();
        let keys = self.plan.rule.post_keys();
        while post.elapsed() < spec.post_interval {
            for press in session.tick(keys)? {
                self.report(session, spec.condition, &mut scoring, press, onset_at)?;
            }
        }
        let post_wait_secs = post.elapsed_secs();

        Ok(TrialOutcome {
            index: spec.index,
            condition: spec.condition,
            side: spec.side,
            position,
            responses: scoring.responses,
            classification: scoring.classification.unwrap_or(Classification::None),
            judgment: scoring.judgment,
            correct_button: scoring.correct_button,
            pre_wait_secs,
            stimulus_secs,
            post_wait_secs,
            duration_secs: trial_watch.elapsed_secs(),
        })
    }

    /// Presses while the stimulus is up.
    fn score(
        &self,
        session: &mut Session,
        condition: Condition,
        scoring: &mut Scoring,
        press: KeyPress,
        onset: Duration,
    ) -> Result<()> {
        let at_secs = press.at.saturating_sub(onset).as_secs_f64();
        let responded = scoring.classification.is_some() || scoring.judgment.is_some();

        let kind = match self.plan.rule {
            _ if responded => ResponseKind::Repeat,
            ResponseRule::Detection { mapping } => {
                if condition.is_target() {
                    scoring.classification = Some(Classification::Hit);
                    scoring.correct_button = mapping.key_for(condition).map(|k| k == press.key);
                    session.event(if condition.is_distractor() {
                        "Perceived Distractor"
                    } else {
                        "Perceived Stimulus"
                    })?;
                    ResponseKind::Perceived
                } else {
                    scoring.classification = Some(Classification::FalseAlarm);
                    session.event("False alarm response")?;
                    ResponseKind::FalseAlarm
                }
            }
            ResponseRule::ForcedChoice => {
                let (judgment, msg) = match press.key {
                    Key::Char('1') => (Judgment::LeftBrighter, "Left stimulus perceived brighter"),
                    Key::Char('2') => (Judgment::RightBrighter, "Right stimulus perceived brighter"),
                    _ => (Judgment::Same, "Stimuli perceived equally bright"),
                };
                scoring.judgment = Some(judgment);
                session.event(msg)?;
                ResponseKind::Judgment(judgment)
            }
            ResponseRule::AfterimageReport => return Ok(()),
        };

        if kind == ResponseKind::Repeat {
            session.note(&format!("Repeated response `{}`", press.key))?;
        }
        scoring.responses.push(Response {
            key: press.key,
            at_secs,
            kind,
        });
        Ok(())
    }

    /// Afterimage onset/offset reports after stimulus offset. Every press is
    /// kept; the first one classifies the trial.
    fn report(
        &self,
        session: &mut Session,
        condition: Condition,
        scoring: &mut Scoring,
        press: KeyPress,
        onset: Duration,
    ) -> Result<()> {
        if self.plan.rule != ResponseRule::AfterimageReport {
            return Ok(());
        }
        let (kind, what) = match press.key {
            Key::Char('1') => (ResponseKind::Onset, "onset"),
            _ => (ResponseKind::Offset, "offset"),
        };
        let truth = if condition.is_target() { "True" } else { "False" };
        session.event(&format!("{truth} positive afterimage {what}"))?;

        scoring.classification.get_or_insert(if condition.is_target() {
            Classification::Hit
        } else {
            Classification::FalseAlarm
        });
        scoring.responses.push(Response {
            key: press.key,
            at_secs: press.at.saturating_sub(onset).as_secs_f64(),
            kind,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedKeys, SimHandles, sim_collaborators};
    use glare_core::{CalibrationState, Side};
    use glare_timing::ManualTimer;

    fn spec(condition: Condition, side: Side) -> TrialSpec {
        TrialSpec {
            index: 0,
            condition,
            side,
            pre_interval: Duration::from_secs(1),
            post_interval: Duration::from_secs(1),
        }
    }

    fn detection() -> TrialPlan {
        TrialPlan {
            stimulus: StimulusWindow::Timed(Duration::from_secs(1)),
            rule: ResponseRule::Detection {
                mapping: ButtonMapping::PlusFirst,
            },
            fixation: true,
            prompt: None,
        }
    }

    fn session_with(keys: impl FnOnce(ScriptedKeys) -> ScriptedKeys) -> (Session, SimHandles) {
        let clock = ManualTimer::new();
        let keys = keys(ScriptedKeys::new(clock.clone()));
        let (collab, handles) = sim_collaborators(clock, Duration::from_millis(1), keys);
        (Session::new(collab), handles)
    }

    #[test]
    fn states_run_in_order_and_durations_match_the_spec() {
        let (mut session, handles) = session_with(|k| k);
        let layout = CalibrationState::new(10.0, 2.0).layout();
        let mut runner = TrialRunner::new(detection());

        let outcome = runner
            .run(&mut session, &spec(Condition::Glare, Side::Left), &layout)
            .unwrap();

        assert_eq!(
            runner.transitions(),
            &[
                TrialState::PreWait,
                TrialState::StimulusOn,
                TrialState::ResponseWindow,
                TrialState::StimulusOff,
                TrialState::PostWait,
                TrialState::Done,
            ]
        );
        assert!((outcome.pre_wait_secs - 1.0).abs() < 0.01);
        assert!((outcome.stimulus_secs - 1.0).abs() < 0.01);
        assert!((outcome.post_wait_secs - 1.0).abs() < 0.01);
        assert_eq!(outcome.position, Position::new(-10.0, 2.0));
        assert_eq!(outcome.classification, Classification::None);
        assert!(!handles.scene.borrow().visible.contains_key(&StimulusId::Glare));
    }

    #[test]
    fn first_press_on_a_distractor_wins() {
        // pre-wait runs to 1.0s; both presses land inside the stimulus window
        let (mut session, _) = session_with(|k| {
            k.tap(Duration::from_millis(1300), Key::Char('1'))
                .tap(Duration::from_millis(200), Key::Char('2'))
        });
        let layout = CalibrationState::new(12.0, 5.0).layout();
        let mut runner = TrialRunner::new(detection());

        let outcome = runner
            .run(&mut session, &spec(Condition::DistractorPlus, Side::Right), &layout)
            .unwrap();

        assert_eq!(outcome.classification, Classification::Hit);
        assert_eq!(outcome.side, Side::Right);
        assert_eq!(outcome.correct_button, Some(true));
        let kinds: Vec<ResponseKind> = outcome.responses.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ResponseKind::Perceived, ResponseKind::Repeat]);
        assert!(outcome.responses[0].at_secs > 0.2 && outcome.responses[0].at_secs < 0.4);
    }

    #[test]
    fn press_on_a_non_target_is_a_false_alarm() {
        let (mut session, handles) =
            session_with(|k| k.tap(Duration::from_millis(1500), Key::Char('2')));
        let layout = CalibrationState::new(12.0, 5.0).layout();
        let mut runner = TrialRunner::new(detection());

        let outcome = runner
            .run(&mut session, &spec(Condition::Iso, Side::Left), &layout)
            .unwrap();

        assert_eq!(outcome.classification, Classification::FalseAlarm);
        assert_eq!(outcome.correct_button, None);
        assert!(handles.log.contents().contains("False alarm response"));
    }

    #[test]
    fn forced_choice_holds_the_pair_until_answered() {
        let (mut session, handles) =
            session_with(|k| k.tap(Duration::from_millis(4000), Key::Char('3')));
        let layout = StimulusLayout::mirrored(12.0, 0.0);
        let mut runner = TrialRunner::new(TrialPlan {
            stimulus: StimulusWindow::UntilResponse,
            rule: ResponseRule::ForcedChoice,
            fixation: true,
            prompt: Some("Which image is brighter?"),
        });

        let outcome = runner
            .run(&mut session, &spec(Condition::GlareVsIso, Side::Right), &layout)
            .unwrap();

        assert_eq!(outcome.judgment, Some(Judgment::Same));
        assert!((outcome.stimulus_secs - 3.0).abs() < 0.01);
        let shown = &handles.scene.borrow().onsets;
        assert!(shown.contains(&(StimulusId::Glare, Position::new(12.0, 0.0))));
        assert!(shown.contains(&(StimulusId::Iso, Position::new(-12.0, 0.0))));
    }

    #[test]
    fn afterimage_reports_count_after_offset_only() {
        let (mut session, handles) = session_with(|k| {
            k.tap(Duration::from_millis(1500), Key::Char('1'))
                .tap(Duration::from_millis(1000), Key::Char('1'))
                .tap(Duration::from_millis(200), Key::Char('2'))
        });
        let layout = CalibrationState::new(12.0, 5.0).layout();
        let mut runner = TrialRunner::new(TrialPlan {
            stimulus: StimulusWindow::Timed(Duration::from_secs(1)),
            rule: ResponseRule::AfterimageReport,
            fixation: true,
            prompt: None,
        });

        let outcome = runner
            .run(&mut session, &spec(Condition::Blank, Side::Left), &layout)
            .unwrap();

        // the 1.5s press falls inside the stimulus window and is ignored
        let kinds: Vec<ResponseKind> = outcome.responses.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ResponseKind::Onset, ResponseKind::Offset]);
        assert_eq!(outcome.classification, Classification::FalseAlarm);
        assert!(handles.log.contents().contains("False positive afterimage onset"));
    }

    #[test]
    fn abort_mid_trial_hides_stimuli_and_yields_no_outcome() {
        let (mut session, handles) = session_with(|k| {
            k.push(
                Duration::from_millis(1500),
                glare_core::KeyEvent::pressed(Key::Escape),
            )
        });
        let layout = CalibrationState::new(12.0, 5.0).layout();
        let mut runner = TrialRunner::new(detection());

        let err = runner
            .run(&mut session, &spec(Condition::White, Side::Left), &layout)
            .unwrap_err();

        assert!(err.is_abort());
        assert_eq!(runner.state(), TrialState::Aborted);
        assert!(!handles.scene.borrow().visible.contains_key(&StimulusId::White));
    }
}
