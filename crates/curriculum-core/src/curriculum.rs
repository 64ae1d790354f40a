//! Reward curriculum aggregation
//!
//! A [`RewardCurriculum`] is an ordered, densely-indexed sequence of reward
//! terms over an environment state snapshot. Evaluation walks the terms in
//! ascending index order, sums their scalar outputs, and merges their labeled
//! breakdowns into one diagnostic mapping; a later term's entry overwrites an
//! earlier term's entry under the same key.
//!
//! The sequence is fixed at construction: [`CurriculumBuilder::build`] rejects
//! any declared index left without a term, so a wiring gap surfaces when the
//! environment is created rather than mid-training. Adding a new shaping term
//! to an environment means binding one more closure and raising the declared
//! bound by one.

use tracing::debug;

use crate::error::{CurriculumError, Result, TermError};
use crate::reward::{Reward, RewardComponents};

/// Reward term callback: reads the state snapshot, returns a scalar and its
/// labeled breakdown. Must not mutate anything.
pub type TermFn<S> = Box<dyn Fn(&S) -> std::result::Result<Reward, TermError> + Send + Sync>;

struct Term<S> {
    name: String,
    func: TermFn<S>,
}

/// Ordered, immutable sequence of reward terms over state `S`
pub struct RewardCurriculum<S> {
    terms: Vec<Term<S>>,
}

impl<S> RewardCurriculum<S> {
    /// Start building a curriculum with terms at indices `0..=last_index`
    pub fn builder(last_index: usize) -> CurriculumBuilder<S> {
        CurriculumBuilder {
            slots: (0..=last_index).map(|_| None).collect(),
            error: None,
        }
    }

    /// Number of terms
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// True if the curriculum has no terms (never constructible via the builder)
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term names in index order
    pub fn term_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.name.as_str())
    }

    /// Evaluate every term against `state`, ascending by index.
    ///
    /// Returns the summed total and the merged breakdown. A failing term
    /// aborts the whole evaluation; no partial result is produced. Given an
    /// identical snapshot the result is identical on every call.
    pub fn evaluate(&self, state: &S) -> Result<Reward> {
        let mut total = 0.0;
        let mut breakdown = RewardComponents::new();
        for (index, term) in self.terms.iter().enumerate() {
            let reward = (term.func)(state).map_err(|source| CurriculumError::TermFailed {
                index,
                name: term.name.clone(),
                source,
            })?;
            total += reward.total;
            for (key, value) in reward.breakdown {
                if let Some(previous) = breakdown.insert(key.clone(), value) {
                    debug!(
                        term = %term.name,
                        index,
                        key = %key,
                        previous,
                        value,
                        "reward breakdown key overwritten"
                    );
                }
            }
        }
        Ok(Reward { total, breakdown })
    }
}

/// Builder for [`RewardCurriculum`]
///
/// Binds terms either in insertion order ([`term`](Self::term)) or at an
/// explicit slot ([`term_at`](Self::term_at)). Binding errors are deferred and
/// reported by [`build`](Self::build), which also rejects any unbound slot.
pub struct CurriculumBuilder<S> {
    slots: Vec<Option<Term<S>>>,
    error: Option<CurriculumError>,
}

impl<S> CurriculumBuilder<S> {
    /// Bind a term to the lowest unbound slot
    pub fn term<F>(self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&S) -> std::result::Result<Reward, TermError> + Send + Sync + 'static,
    {
        let index = self.slots.iter().position(Option::is_none);
        match index {
            Some(index) => self.term_at(index, name, func),
            // All slots bound; report against the first out-of-range index.
            None => {
                let last = self.slots.len() - 1;
                self.term_at(last + 1, name, func)
            }
        }
    }

    /// Bind a term to an explicit slot
    pub fn term_at<F>(mut self, index: usize, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&S) -> std::result::Result<Reward, TermError> + Send + Sync + 'static,
    {
        if self.error.is_some() {
            return self;
        }
        let name = name.into();
        let last = self.slots.len() - 1;
        if index > last {
            self.error = Some(CurriculumError::IndexOutOfRange { name, index, last });
            return self;
        }
        match &self.slots[index] {
            Some(existing) => {
                self.error = Some(CurriculumError::DuplicateIndex {
                    index,
                    existing: existing.name.clone(),
                    duplicate: name,
                });
            }
            None => {
                self.slots[index] = Some(Term {
                    name,
                    func: Box::new(func),
                });
            }
        }
        self
    }

    /// Validate the sequence and freeze it.
    ///
    /// Fails with [`CurriculumError::UnboundIndex`] naming the first declared
    /// index that has no term; a gap is a wiring bug, never tolerated.
    pub fn build(self) -> Result<RewardCurriculum<S>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let last = self.slots.len() - 1;
        let mut terms = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            terms.push(slot.ok_or(CurriculumError::UnboundIndex { index, last })?);
        }
        Ok(RewardCurriculum { terms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoState;

    fn constant(total: f64, key: &'static str, value: f64) -> TermFn<NoState> {
        Box::new(move |_| Ok(Reward::new(total).component(key, value)))
    }

    fn four_term_curriculum() -> RewardCurriculum<NoState> {
        RewardCurriculum::builder(3)
            .term("first", constant(1.0, "a", 1.0))
            .term("second", constant(2.0, "b", 2.0))
            .term("third", constant(3.0, "a", 3.0))
            .term("fourth", constant(4.0, "c", 4.0))
            .build()
            .unwrap()
    }

    #[test]
    fn sums_scalars_and_merges_breakdowns() {
        let reward = four_term_curriculum().evaluate(&NoState).unwrap();
        assert!((reward.total - 10.0).abs() < 1e-12);
        assert_eq!(reward.breakdown.len(), 3);
        assert_eq!(reward.breakdown["a"], 3.0);
        assert_eq!(reward.breakdown["b"], 2.0);
        assert_eq!(reward.breakdown["c"], 4.0);
    }

    #[test]
    fn total_matches_individual_scalars_in_any_order() {
        let scalars = [1.0, 2.0, 3.0, 4.0];
        let forward: f64 = scalars.iter().sum();
        let backward: f64 = scalars.iter().rev().sum();
        let reward = four_term_curriculum().evaluate(&NoState).unwrap();
        assert!((reward.total - forward).abs() < 1e-12);
        assert!((reward.total - backward).abs() < 1e-12);
    }

    #[test]
    fn later_index_wins_breakdown_collision() {
        let curriculum: RewardCurriculum<NoState> = RewardCurriculum::builder(1)
            .term("early", constant(0.0, "shared", -1.0))
            .term("late", constant(0.0, "shared", 7.5))
            .build()
            .unwrap();
        let reward = curriculum.evaluate(&NoState).unwrap();
        assert_eq!(reward.breakdown["shared"], 7.5);
    }

    #[test]
    fn unbound_slot_fails_construction() {
        // Declares indices 0..=3 but binds only three terms: slot 3 is a gap.
        let result = RewardCurriculum::builder(3)
            .term("first", constant(1.0, "a", 1.0))
            .term("second", constant(2.0, "b", 2.0))
            .term("fourth", constant(4.0, "c", 4.0))
            .build();
        match result {
            Err(CurriculumError::UnboundIndex { index: 3, last: 3 }) => {}
            other => panic!("expected UnboundIndex at 3, got {:?}", other.err()),
        }
    }

    #[test]
    fn explicit_gap_fails_construction() {
        let result: Result<RewardCurriculum<NoState>> = RewardCurriculum::builder(3)
            .term_at(0, "first", constant(1.0, "a", 1.0))
            .term_at(1, "second", constant(2.0, "b", 2.0))
            .term_at(3, "fourth", constant(4.0, "c", 4.0))
            .build();
        match result {
            Err(CurriculumError::UnboundIndex { index: 2, last: 3 }) => {}
            other => panic!("expected UnboundIndex at 2, got {:?}", other.err()),
        }
    }

    #[test]
    fn duplicate_slot_fails_construction() {
        let result: Result<RewardCurriculum<NoState>> = RewardCurriculum::builder(1)
            .term_at(0, "first", constant(1.0, "a", 1.0))
            .term_at(0, "again", constant(2.0, "b", 2.0))
            .build();
        assert!(matches!(
            result,
            Err(CurriculumError::DuplicateIndex { index: 0, .. })
        ));
    }

    #[test]
    fn binding_past_declared_range_fails_construction() {
        let result: Result<RewardCurriculum<NoState>> = RewardCurriculum::builder(0)
            .term("only", constant(1.0, "a", 1.0))
            .term("extra", constant(2.0, "b", 2.0))
            .build();
        assert!(matches!(
            result,
            Err(CurriculumError::IndexOutOfRange { index: 1, last: 0, .. })
        ));
    }

    #[test]
    fn failing_term_aborts_evaluation() {
        let curriculum: RewardCurriculum<NoState> = RewardCurriculum::builder(1)
            .term("ok", constant(1.0, "a", 1.0))
            .term("broken", |_: &NoState| {
                Err(TermError::from("derived quantity unavailable"))
            })
            .build()
            .unwrap();
        match curriculum.evaluate(&NoState) {
            Err(CurriculumError::TermFailed { index: 1, name, .. }) => {
                assert_eq!(name, "broken");
            }
            other => panic!("expected TermFailed, got {:?}", other.err()),
        }
    }

    #[test]
    fn evaluation_is_deterministic() {
        let curriculum = four_term_curriculum();
        let first = curriculum.evaluate(&NoState).unwrap();
        let second = curriculum.evaluate(&NoState).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn terms_are_evaluated_in_index_order() {
        let curriculum: RewardCurriculum<NoState> = RewardCurriculum::builder(2)
            .term_at(2, "c", constant(0.0, "winner", 2.0))
            .term_at(0, "a", constant(0.0, "winner", 0.0))
            .term_at(1, "b", constant(0.0, "winner", 1.0))
            .build()
            .unwrap();
        let names: Vec<_> = curriculum.term_names().collect();
        assert_eq!(names, ["a", "b", "c"]);
        // Index order, not registration order, decides the overwrite.
        let reward = curriculum.evaluate(&NoState).unwrap();
        assert_eq!(reward.breakdown["winner"], 2.0);
    }
}
