use crate::collab::KeySource;
use crate::error::{ExperimentError, Result};
use glare_core::{Key, KeyPress, KeyState};
use glare_timing::Timer;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Edge-triggered key poller.
///
/// A key is reported once per physical press: repeated `Pressed` events for
/// a key that is still held are ignored until its `Released` arrives. Abort
/// keys are honored on every poll regardless of the allowed set.
pub struct InputPoller {
    source: Box<dyn KeySource>,
    held: BTreeSet<Key>,
    timer: Arc<dyn Timer>,
}

impl InputPoller {
    pub fn new(source: Box<dyn KeySource>, timer: Arc<dyn Timer>) -> Self {
        Self {
            source,
            held: BTreeSet::new(),
            timer,
        }
    }

    /// Drains pending events and returns the new presses of `allowed` keys,
    /// stamped with the poll time.
    pub fn poll(&mut self, allowed: &[Key]) -> Result<Vec<KeyPress>> {
        let events = self.source.drain()?;
        let at = self.timer.now();
        let mut presses = Vec::new();

        for event in events {
            match event.state {
                KeyState::Released => {
                    self.held.remove(&event.key);
                }
                KeyState::Pressed => {
                    if !self.held.insert(event.key) {
                        continue;
                    }
                    if event.key.is_abort() {
                        return Err(ExperimentError::Aborted { key: event.key });
                    }
                    if allowed.contains(&event.key) {
                        presses.push(KeyPress { key: event.key, at });
                    }
                }
            }
        }
        Ok(presses)
    }

    /// Discards pending presses. Abort keys still terminate the run.
    pub fn clear(&mut self) -> Result<()> {
        self.poll(&[]).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use glare_core::KeyEvent;
    use glare_timing::ManualTimer;
    use std::collections::VecDeque;
    use std::time::Duration;

    struct Batches(VecDeque<Vec<KeyEvent>>);

    impl KeySource for Batches {
        fn drain(&mut self) -> std::result::Result<Vec<KeyEvent>, CollaboratorError> {
            Ok(self.0.pop_front().unwrap_or_default())
        }
    }

    fn poller(batches: Vec<Vec<KeyEvent>>) -> (InputPoller, ManualTimer) {
        let clock = ManualTimer::new();
        let source = Batches(batches.into_iter().collect());
        (InputPoller::new(Box::new(source), Arc::new(clock.clone())), clock)
    }

    #[test]
    fn held_key_is_reported_once() {
        let one = Key::Char('1');
        let (mut input, clock) = poller(vec![
            vec![KeyEvent::pressed(one)],
            vec![KeyEvent::pressed(one)],
            vec![KeyEvent::released(one), KeyEvent::pressed(one)],
        ]);
        clock.advance(Duration::from_millis(250));

        let first = input.poll(&[one]).unwrap();
        assert_eq!(first, vec![KeyPress { key: one, at: Duration::from_millis(250) }]);
        assert!(input.poll(&[one]).unwrap().is_empty());
        assert_eq!(input.poll(&[one]).unwrap().len(), 1);
    }

    #[test]
    fn keys_outside_the_allowed_set_are_dropped() {
        let (mut input, _) = poller(vec![vec![
            KeyEvent::pressed(Key::Char('9')),
            KeyEvent::pressed(Key::Space),
        ]]);
        let presses = input.poll(&[Key::Space]).unwrap();
        assert_eq!(presses.len(), 1);
        assert_eq!(presses[0].key, Key::Space);
    }

    #[test]
    fn abort_key_wins_even_when_clearing() {
        let (mut input, _) = poller(vec![vec![
            KeyEvent::pressed(Key::Char('1')),
            KeyEvent::pressed(Key::Char('p')),
        ]]);
        let err = input.clear().unwrap_err();
        assert!(matches!(err, ExperimentError::Aborted { key: Key::Char('p') }));
    }
}
