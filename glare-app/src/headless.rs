//! Display-less backend: virtual clock, in-memory scene and a key script.

use anyhow::{Context, Result, bail};
use glare_experiment::sim::{ScriptedKeys, ScriptedTap, SimDisplay};
use glare_experiment::{Collaborators, Tracker};
use glare_timing::{ManualTimer, Timer};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn load_script(path: &Path) -> Result<Vec<ScriptedTap>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading key script {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing key script {}", path.display()))
}

/// One simulated refresh period. A period that rounds to zero would stop
/// the virtual clock, so it is rejected along with non-positive rates.
fn frame_duration(frame_hz: f64) -> Result<Duration> {
    if !(frame_hz.is_finite() && frame_hz > 0.0) {
        bail!("frame rate must be positive (got {frame_hz})");
    }
    match Duration::try_from_secs_f64(1.0 / frame_hz) {
        Ok(frame) if !frame.is_zero() => Ok(frame),
        _ => bail!("frame rate {frame_hz} Hz is out of range"),
    }
}

/// Wires the simulated collaborators. Every refresh advances the virtual
/// clock by one frame at `frame_hz`.
pub fn collaborators(
    script: Option<&Path>,
    frame_hz: f64,
    tracker: Box<dyn Tracker>,
    log_sink: Box<dyn Write>,
) -> Result<(Collaborators, ManualTimer)> {
    let frame = frame_duration(frame_hz)?;
    let taps = match script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let clock = ManualTimer::new();
    let timer: Arc<dyn Timer> = Arc::new(clock.clone());
    let collab = Collaborators {
        timer,
        presenter: Box::new(SimDisplay::new(clock.clone(), frame)),
        keys: Box::new(ScriptedKeys::from_taps(clock.clone(), &taps)),
        tracker,
        log_sink,
    };
    Ok((collab, clock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glare_core::Key;
    use glare_experiment::DummyTracker;

    #[test]
    fn script_file_lists_taps_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"after_ms": 200, "key": "space"}}, {{"after_ms": 50, "key": "5"}}]"#
        )
        .unwrap();

        let taps = load_script(file.path()).unwrap();

        assert_eq!(
            taps,
            vec![
                ScriptedTap { after_ms: 200, key: Key::Space },
                ScriptedTap { after_ms: 50, key: Key::Char('5') },
            ]
        );
    }

    #[test]
    fn frame_rates_that_would_stall_the_clock_are_refused() {
        assert_eq!(frame_duration(100.0).unwrap(), Duration::from_millis(10));
        assert!(frame_duration(1e12).is_err());
        assert!(frame_duration(1e-300).is_err());
        assert!(frame_duration(f64::NAN).is_err());
        assert!(frame_duration(-60.0).is_err());
    }

    #[test]
    fn zero_frame_rate_is_refused() {
        let built = collaborators(
            None,
            0.0,
            Box::new(DummyTracker::new()),
            Box::new(std::io::sink()),
        );
        assert!(built.is_err());
    }
}
