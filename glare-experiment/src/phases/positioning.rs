use crate::config::PositioningConfig;
use crate::error::Result;
use crate::session::Session;
use glare_core::{CalibrationState, Key, Position, StimulusId};

const KEYS: [Key; 5] = [
    Key::Char('1'),
    Key::Char('2'),
    Key::Char('3'),
    Key::Char('4'),
    Key::Space,
];

const INTRO: &str = "In this part you will adjust where the images appear.\n\n\
    Keep your eyes on the central dot.\n\n\
    Press SPACE to begin.";

const HINT: &str = "1 = up   2 = down   3 = apart   4 = together\n\nPress SPACE when done.";

/// Interactive adjustment of the mirrored stimulus pair. Returns the
/// accepted calibration; the horizontal offset never goes below zero.
pub fn run(
    session: &mut Session,
    cfg: &PositioningConfig,
    start: CalibrationState,
) -> Result<CalibrationState> {
    session.instruction(INTRO)?;

    let mut calibration = start;
    session.show(StimulusId::Fixation, Position::CENTER);
    draw(session, &calibration);
    session.message(Some(HINT));
    session.clear_input()?;

    loop {
        let press = session.wait_for_keys(&KEYS)?;
        match press.key {
            Key::Char('1') => calibration.y_offset += cfg.step,
            Key::Char('2') => calibration.y_offset -= cfg.step,
            Key::Char('3') => calibration.x_offset += cfg.step,
            Key::Char('4') => calibration.x_offset = (calibration.x_offset - cfg.step).max(0.0),
            _ => break,
        }
        draw(session, &calibration);
    }

    session.message(None);
    session.hide(StimulusId::NonglareLeft);
    session.hide(StimulusId::NonglareRight);
    session.hide(StimulusId::Fixation);
    log_final(session, &calibration)?;
    Ok(calibration)
}

fn draw(session: &mut Session, calibration: &CalibrationState) {
    let layout = calibration.layout();
    session.show(StimulusId::NonglareLeft, layout.left);
    session.show(StimulusId::NonglareRight, layout.right);
}

pub fn log_final(session: &mut Session, calibration: &CalibrationState) -> Result<()> {
    session.event(&format!(
        "Final x-axis position of stimuli: {}",
        calibration.x_offset
    ))?;
    session.event(&format!(
        "Final y-axis position of stimuli: {}",
        calibration.y_offset
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{ScriptedKeys, sim_collaborators};
    use glare_timing::ManualTimer;
    use std::time::Duration;

    fn taps(clock: &ManualTimer, keys: &[char]) -> ScriptedKeys {
        keys.iter().fold(ScriptedKeys::new(clock.clone()), |k, c| {
            let key = if *c == ' ' { Key::Space } else { Key::Char(*c) };
            k.tap(Duration::from_millis(20), key)
        })
    }

    #[test]
    fn adjustments_move_the_pair_and_inward_clamps_at_zero() {
        let clock = ManualTimer::new();
        let keys = taps(&clock, &[' ', '1', '1', '3', '4', '4', '4', ' ']);
        let (collab, handles) = sim_collaborators(clock, Duration::from_millis(1), keys);
        let mut session = Session::new(collab);
        let cfg = PositioningConfig {
            step: 0.25,
            ..PositioningConfig::default()
        };

        let result = run(&mut session, &cfg, CalibrationState::new(0.25, 5.0)).unwrap();

        assert_eq!(result, CalibrationState::new(0.0, 5.5));
        let log = handles.log.messages();
        assert!(log.contains(&"Final x-axis position of stimuli: 0".to_string()));
        assert!(log.contains(&"Final y-axis position of stimuli: 5.5".to_string()));
        assert!(handles.scene.borrow().visible.is_empty());
    }
}
