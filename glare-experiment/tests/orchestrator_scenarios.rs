use glare_core::{CalibrationState, Condition, Key, PhaseKind};
use glare_experiment::sim::{ScriptedKeys, SimHandles, sim_collaborators};
use glare_experiment::{ConditionCount, Experiment, ExperimentConfig, IntervalRange, Tracker};
use glare_timing::ManualTimer;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Short main phase on a known calibration; positioning and afterimage off.
fn config() -> ExperimentConfig {
    let mut config = ExperimentConfig {
        max_blocks: 3,
        seed: Some(17),
        initial_calibration: Some(CalibrationState::new(10.0, 2.0)),
        ..ExperimentConfig::default()
    };
    config.skip.positioning = true;
    config.skip.afterimage = true;
    config.main.counts = vec![ConditionCount::balanced(Condition::DistractorPlus, 2)];
    config.main.isi = IntervalRange::fixed(1);
    config.main.stimulus_secs = 1.0;
    config.brightness.counts = vec![ConditionCount::balanced(Condition::GlareVsIso, 2)];
    config.brightness.pre_secs = 1;
    config
}

/// Setup screen, key check, and the three main-phase intro screens.
fn opening(clock: &ManualTimer) -> ScriptedKeys {
    ScriptedKeys::new(clock.clone())
        .tap(ms(50), Key::Space)
        .tap(ms(50), Key::Char('1'))
        .tap(ms(50), Key::Char('2'))
        .tap(ms(50), Key::Char('3'))
        .tap(ms(50), Key::Space)
        .tap(ms(50), Key::Space)
        .tap(ms(50), Key::Space)
}

/// Ready screen and start trigger of one block.
fn block_start(keys: ScriptedKeys) -> ScriptedKeys {
    keys.tap(ms(50), Key::Space).tap(ms(50), Key::Char('5'))
}

fn experiment(
    config: ExperimentConfig,
    keys: ScriptedKeys,
    clock: ManualTimer,
) -> (Experiment, SimHandles) {
    let (collab, handles) = sim_collaborators(clock, ms(1), keys);
    (Experiment::new(config, collab).unwrap(), handles)
}

#[test]
fn break_key_moves_on_without_a_second_block() {
    let clock = ManualTimer::new();
    // main block: two 3s trials, then `b` on the break screen
    let keys = block_start(opening(&clock)).tap(ms(8000), Key::Char('b'));
    // brightness: intro, preview, one block answered `1` then `3`, then `b`
    let keys = block_start(keys.tap(ms(50), Key::Space).tap(ms(50), Key::Space))
        .tap(ms(1500), Key::Char('1'))
        .tap(ms(1500), Key::Char('3'))
        .tap(ms(500), Key::Char('b'))
        .tap(ms(50), Key::Space);
    let (mut experiment, handles) = experiment(config(), keys, clock);

    let report = experiment.run().unwrap();

    assert_eq!(report.phases_run, vec![PhaseKind::Main, PhaseKind::Brightness]);
    assert_eq!(report.summaries.len(), 2);
    assert_eq!(report.summaries[0].phase, PhaseKind::Main);
    assert_eq!(report.summaries[0].trial_count(), 2);
    let judgments = report.summaries[1].judgments;
    assert_eq!((judgments.left_brighter, judgments.same), (1, 1));

    let log = handles.log.messages();
    assert_eq!(log.iter().filter(|m| *m == "Block #1").count(), 2);
    assert!(!log.iter().any(|m| m == "Block #2"));
    assert!(log.contains(&"Button Condition: 1".to_string()));
    assert!(log.contains(&"Final x-axis position of stimuli: 10".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("*** END EXPERIMENT ***"));

    // one recording per phase, closed before the next one starts
    assert_eq!(handles.tracker.recording_starts(), report.phases_run.len());
    assert_eq!(handles.tracker.recording_stops(), report.phases_run.len());
    assert!(!handles.tracker.is_recording());
}

#[test]
fn repositioning_mid_phase_moves_later_trials() {
    let clock = ManualTimer::new();
    let mut config = config();
    config.max_blocks = 2;
    config.skip.brightness = true;

    // block 1, then `l`; positioning intro, out, out, up, accept
    let keys = block_start(opening(&clock))
        .tap(ms(8000), Key::Char('l'))
        .tap(ms(50), Key::Space)
        .tap(ms(50), Key::Char('3'))
        .tap(ms(50), Key::Char('3'))
        .tap(ms(50), Key::Char('1'))
        .tap(ms(50), Key::Space);
    // block 2 is the last one; its break screen only moves on
    let keys = block_start(keys)
        .tap(ms(8000), Key::Char('l'))
        .tap(ms(50), Key::Space)
        .tap(ms(50), Key::Space);
    let (mut experiment, handles) = experiment(config, keys, clock);

    let report = experiment.run().unwrap();

    assert_eq!(report.summaries.len(), 2);
    for outcome in &report.summaries[0].outcomes {
        assert_eq!(outcome.position.x.abs(), 10.0);
        assert_eq!(outcome.position.y, 2.0);
    }
    for outcome in &report.summaries[1].outcomes {
        assert_eq!(outcome.position.x.abs(), 10.5);
        assert_eq!(outcome.position.y, 2.25);
    }
    assert_eq!(report.calibration, Some(CalibrationState::new(10.5, 2.25)));

    let log = handles.log.messages();
    assert!(log.contains(&"Right Stimulus Location: (10.5, 2.25)".to_string()));
    assert!(log.contains(&"Maximum block count reached".to_string()));
    let redos = log.iter().filter(|m| *m == "Redo stimulus positioning").count();
    assert_eq!(redos, 1);
}

#[test]
fn abort_tears_down_exactly_once() {
    let clock = ManualTimer::new();
    let keys = block_start(opening(&clock)).tap(ms(500), Key::Escape);
    let (mut experiment, handles) = experiment(config(), keys, clock);

    let err = experiment.run().unwrap_err();

    assert!(err.is_abort());
    assert!(experiment.report().summaries.is_empty());
    assert!(!handles.tracker.is_recording());
    assert_eq!(handles.tracker.recording_starts(), 1);
    assert_eq!(handles.tracker.recording_stops(), 1);
    assert!(handles.scene.borrow().visible.is_empty());

    drop(experiment);
    let ends = handles
        .log
        .messages()
        .iter()
        .filter(|m| *m == "*** END EXPERIMENT ***")
        .count();
    assert_eq!(ends, 1);
    assert!(handles.tracker.messages().contains(&"Start Experiment".to_string()));
}

#[test]
fn invalid_config_is_rejected_before_anything_runs() {
    let clock = ManualTimer::new();
    let mut config = config();
    config.main.counts = vec![ConditionCount::balanced(Condition::Glare, 3)];
    let (collab, handles) = sim_collaborators(clock.clone(), ms(1), ScriptedKeys::new(clock));

    assert!(Experiment::new(config, collab).is_err());
    assert!(handles.log.contents().is_empty());
    assert_eq!(handles.tracker.recording_starts(), 0);
}
