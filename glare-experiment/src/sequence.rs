//! Balanced, shuffled condition and side schedules for one block.
//!
//! Every condition contributes exactly its configured count to a uniformly
//! shuffled condition sequence. Balanced conditions additionally get their
//! own side sequence of the same length, half left and half right, shuffled
//! independently. Trials index into their condition's side sequence through
//! a per-condition cursor that is bounds-checked.

use crate::error::ConfigError;
use glare_core::{Condition, Phase, PhaseKind, Side, TrialSpec};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionCount {
    pub condition: Condition,
    pub count: usize,
    #[serde(default = "default_balanced")]
    pub balanced: bool,
}

fn default_balanced() -> bool {
    true
}

impl ConditionCount {
    pub fn balanced(condition: Condition, count: usize) -> Self {
        Self {
            condition,
            count,
            balanced: true,
        }
    }

    pub fn unbalanced(condition: Condition, count: usize) -> Self {
        Self {
            condition,
            count,
            balanced: false,
        }
    }
}

/// Inclusive range of whole seconds an interval is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl IntervalRange {
    pub const fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn fixed(secs: u64) -> Self {
        Self::new(secs, secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_secs > self.max_secs {
            return Err(ConfigError::InvalidInterval {
                min: self.min_secs,
                max: self.max_secs,
            });
        }
        Ok(())
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> Duration {
        Duration::from_secs(rng.random_range(self.min_secs..=self.max_secs))
    }
}

pub(crate) fn validate_counts(
    counts: &[ConditionCount],
    phase: PhaseKind,
) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for c in counts {
        if !seen.insert(c.condition) {
            return Err(ConfigError::DuplicateCondition(c.condition));
        }
        if c.balanced && c.count % 2 != 0 {
            return Err(ConfigError::OddBalancedCount {
                condition: c.condition,
                count: c.count,
            });
        }
    }
    if counts.iter().map(|c| c.count).sum::<usize>() == 0 {
        return Err(ConfigError::EmptyBlock {
            phase: phase.label(),
        });
    }
    Ok(())
}

/// Fixed-length side assignments bound to one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideSequence {
    condition: Condition,
    sides: Vec<Side>,
}

impl SideSequence {
    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn len(&self) -> usize {
        self.sides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sides.is_empty()
    }

    pub fn sides(&self) -> &[Side] {
        &self.sides
    }

    pub fn count(&self, side: Side) -> usize {
        self.sides.iter().filter(|s| **s == side).count()
    }

    /// Bounds-checked lookup; running past the end is a configuration defect.
    pub fn get(&self, position: usize) -> Result<Side, ConfigError> {
        self.sides
            .get(position)
            .copied()
            .ok_or(ConfigError::SideSequenceExhausted {
                condition: self.condition,
                len: self.sides.len(),
            })
    }

    fn codes(&self) -> String {
        let codes: Vec<String> = self.sides.iter().map(|s| s.code().to_string()).collect();
        format!("[{}]", codes.join(", "))
    }
}

/// The generated schedule for one block.
#[derive(Debug, Clone)]
pub struct BlockSchedule {
    conditions: Vec<Condition>,
    sides: BTreeMap<Condition, SideSequence>,
    specs: Vec<TrialSpec>,
}

impl BlockSchedule {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn side_sequence(&self, condition: Condition) -> Option<&SideSequence> {
        self.sides.get(&condition)
    }

    pub fn trial_specs(&self) -> &[TrialSpec] {
        &self.specs
    }

    pub fn into_specs(self) -> Vec<TrialSpec> {
        self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Full sequence dump written at block start.
    pub fn audit_lines(&self) -> Vec<String> {
        let names: Vec<&str> = self.conditions.iter().map(|c| c.name()).collect();
        let mut lines = vec![format!("All Stimuli Type Array: [{}]", names.join(", "))];
        for seq in self.sides.values() {
            lines.push(format!(
                "{} Stimuli Location Array (0 = left; 1 = right): {}",
                seq.condition.name(),
                seq.codes()
            ));
        }
        lines
    }
}

pub struct SequenceGenerator<R = StdRng> {
    rng: R,
}

impl SequenceGenerator<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SequenceGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(
        &mut self,
        counts: &[ConditionCount],
        pre: IntervalRange,
        post: IntervalRange,
    ) -> Result<BlockSchedule, ConfigError> {
        pre.validate()?;
        post.validate()?;
        for c in counts {
            if c.balanced && c.count % 2 != 0 {
                return Err(ConfigError::OddBalancedCount {
                    condition: c.condition,
                    count: c.count,
                });
            }
        }

        let mut conditions: Vec<Condition> = counts
            .iter()
            .flat_map(|c| std::iter::repeat_n(c.condition, c.count))
            .collect();
        conditions.shuffle(&mut self.rng);

        let mut sides = BTreeMap::new();
        for c in counts {
            let mut seq: Vec<Side> = if c.balanced {
                let half = c.count / 2;
                std::iter::repeat_n(Side::Left, half)
                    .chain(std::iter::repeat_n(Side::Right, half))
                    .collect()
            } else {
                (0..c.count)
                    .map(|_| {
                        if self.rng.random_bool(0.5) {
                            Side::Right
                        } else {
                            Side::Left
                        }
                    })
                    .collect()
            };
            seq.shuffle(&mut self.rng);
            if sides
                .insert(
                    c.condition,
                    SideSequence {
                        condition: c.condition,
                        sides: seq,
                    },
                )
                .is_some()
            {
                return Err(ConfigError::DuplicateCondition(c.condition));
            }
        }

        let mut cursors: BTreeMap<Condition, usize> = BTreeMap::new();
        let mut specs = Vec::with_capacity(conditions.len());
        for (index, &condition) in conditions.iter().enumerate() {
            let cursor = cursors.entry(condition).or_insert(0);
            let side = match sides.get(&condition) {
                Some(seq) => seq.get(*cursor)?,
                None => {
                    return Err(ConfigError::SideSequenceExhausted { condition, len: 0 });
                }
            };
            *cursor += 1;
            specs.push(TrialSpec {
                index,
                condition,
                side,
                pre_interval: pre.draw(&mut self.rng),
                post_interval: post.draw(&mut self.rng),
            });
        }

        Ok(BlockSchedule {
            conditions,
            sides,
            specs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main_counts() -> Vec<ConditionCount> {
        vec![
            ConditionCount::balanced(Condition::Glare, 8),
            ConditionCount::balanced(Condition::Nonglare, 8),
            ConditionCount::balanced(Condition::Iso, 8),
            ConditionCount::balanced(Condition::White, 8),
            ConditionCount::balanced(Condition::DistractorPlus, 4),
            ConditionCount::balanced(Condition::DistractorCross, 4),
        ]
    }

    #[test]
    fn condition_multiset_matches_configured_counts() {
        let mut generator = SequenceGenerator::from_seed(11);
        let counts = main_counts();
        let schedule = generator
            .generate(&counts, IntervalRange::new(3, 5), IntervalRange::new(3, 5))
            .unwrap();

        assert_eq!(schedule.len(), 32);
        for c in &counts {
            let n = schedule
                .conditions()
                .iter()
                .filter(|x| **x == c.condition)
                .count();
            assert_eq!(n, c.count, "{}", c.condition);
        }
    }

    #[test]
    fn balanced_conditions_split_sides_evenly() {
        let mut generator = SequenceGenerator::from_seed(3);
        let schedule = generator
            .generate(&main_counts(), IntervalRange::fixed(1), IntervalRange::fixed(1))
            .unwrap();

        let glare = schedule.side_sequence(Condition::Glare).unwrap();
        assert_eq!((glare.count(Side::Left), glare.count(Side::Right)), (4, 4));

        for condition in [Condition::DistractorPlus, Condition::DistractorCross] {
            let (left, right) = schedule
                .trial_specs()
                .iter()
                .filter(|s| s.condition == condition)
                .fold((0, 0), |(l, r), s| match s.side {
                    Side::Left => (l + 1, r),
                    Side::Right => (l, r + 1),
                });
            assert_eq!((left, right), (2, 2));
        }
    }

    #[test]
    fn trial_sides_follow_the_condition_sequence_in_order() {
        let mut generator = SequenceGenerator::from_seed(5);
        let schedule = generator
            .generate(&main_counts(), IntervalRange::fixed(1), IntervalRange::fixed(1))
            .unwrap();

        let plus_sides: Vec<Side> = schedule
            .trial_specs()
            .iter()
            .filter(|s| s.condition == Condition::DistractorPlus)
            .map(|s| s.side)
            .collect();
        assert_eq!(
            plus_sides,
            schedule
                .side_sequence(Condition::DistractorPlus)
                .unwrap()
                .sides()
        );
        assert!(schedule.trial_specs().iter().enumerate().all(|(i, s)| s.index == i));
    }

    #[test]
    fn same_seed_reproduces_the_schedule() {
        let counts = main_counts();
        let isi = IntervalRange::new(3, 5);
        let a = SequenceGenerator::from_seed(42)
            .generate(&counts, isi, isi)
            .unwrap();
        let b = SequenceGenerator::from_seed(42)
            .generate(&counts, isi, isi)
            .unwrap();
        let c = SequenceGenerator::from_seed(43)
            .generate(&counts, isi, isi)
            .unwrap();

        assert_eq!(a.trial_specs(), b.trial_specs());
        assert_ne!(a.trial_specs(), c.trial_specs());
    }

    #[test]
    fn intervals_stay_within_the_inclusive_range() {
        let mut generator = SequenceGenerator::from_seed(9);
        let schedule = generator
            .generate(&main_counts(), IntervalRange::new(3, 5), IntervalRange::new(1, 2))
            .unwrap();
        for spec in schedule.trial_specs() {
            assert!((3..=5).contains(&spec.pre_interval.as_secs()));
            assert!((1..=2).contains(&spec.post_interval.as_secs()));
            assert_eq!(spec.pre_interval.subsec_nanos(), 0);
        }
    }

    #[test]
    fn odd_balanced_count_is_a_configuration_error() {
        let mut generator = SequenceGenerator::from_seed(1);
        let err = generator
            .generate(
                &[ConditionCount::balanced(Condition::Blank, 3)],
                IntervalRange::fixed(1),
                IntervalRange::fixed(1),
            )
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::OddBalancedCount {
                condition: Condition::Blank,
                count: 3
            }
        );

        let schedule = generator
            .generate(
                &[ConditionCount::unbalanced(Condition::Blank, 3)],
                IntervalRange::fixed(1),
                IntervalRange::fixed(1),
            )
            .unwrap();
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn side_lookup_past_the_end_is_rejected() {
        let seq = SideSequence {
            condition: Condition::Iso,
            sides: vec![Side::Left, Side::Right],
        };
        assert_eq!(seq.get(1), Ok(Side::Right));
        assert_eq!(
            seq.get(2),
            Err(ConfigError::SideSequenceExhausted {
                condition: Condition::Iso,
                len: 2
            })
        );
    }

    #[test]
    fn audit_dump_lists_sequence_and_side_arrays() {
        let mut generator = SequenceGenerator::from_seed(2);
        let schedule = generator
            .generate(
                &[
                    ConditionCount::balanced(Condition::Afterimage, 2),
                    ConditionCount::balanced(Condition::Blank, 2),
                ],
                IntervalRange::fixed(2),
                IntervalRange::fixed(10),
            )
            .unwrap();
        let lines = schedule.audit_lines();
        assert_eq!(lines.len(), 3);

        let names: Vec<&str> = schedule.conditions().iter().map(|c| c.name()).collect();
        assert_eq!(lines[0], format!("All Stimuli Type Array: [{}]", names.join(", ")));

        for condition in [Condition::Afterimage, Condition::Blank] {
            let sides = schedule.side_sequence(condition).unwrap().sides();
            let codes: Vec<u8> = sides.iter().map(|s| s.code()).collect();
            let mut sorted = codes.clone();
            sorted.sort();
            assert_eq!(sorted, vec![0, 1]);

            let expected = format!(
                "{} Stimuli Location Array (0 = left; 1 = right): [{}, {}]",
                condition.name(),
                codes[0],
                codes[1]
            );
            assert!(lines.contains(&expected), "missing {expected:?} in {lines:?}");
        }
    }

    #[test]
    fn duplicate_condition_rows_are_rejected() {
        let counts = [
            ConditionCount::balanced(Condition::Glare, 2),
            ConditionCount::balanced(Condition::Glare, 2),
        ];
        assert_eq!(
            validate_counts(&counts, PhaseKind::Main),
            Err(ConfigError::DuplicateCondition(Condition::Glare))
        );
        assert!(matches!(
            validate_counts(&[], PhaseKind::Main),
            Err(ConfigError::EmptyBlock { .. })
        ));
    }
}
