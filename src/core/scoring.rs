use serde::Serialize;
use std::ops::Add;
use thiserror::Error;

use crate::config::{CompositionPolicy, DirectionMerge, ScoringConfig};
use crate::core::preference::PreferenceScorer;
use crate::core::similarity::SimilarityScorer;
use crate::models::{EncodedApplicant, Grade};

/// Errors that make a score impossible to compute
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Grade {0:?} has no ordinal and cannot be matched")]
    UnmappedGrade(Grade),

    #[error("Reply frequency {0} is outside 1..=5")]
    ReplyFrequency(u8),

    #[error("Embedding dimension mismatch in {field}: {left} vs {right}")]
    DimensionMismatch {
        field: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Score term {0} is not a finite number")]
    NonFinite(&'static str),
}

/// Directed compatibility score
///
/// `Disqualified` marks a forbidden pairing. It is a normal outcome, not an
/// error, and absorbs everything it is combined with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Score {
    Disqualified,
    Value(f64),
}

impl Score {
    /// Wrap a computed value, rejecting NaN and infinities
    pub fn finite(value: f64, term: &'static str) -> Result<Self, ScoreError> {
        if value.is_finite() {
            Ok(Score::Value(value))
        } else {
            Err(ScoreError::NonFinite(term))
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Score::Value(value) => Some(value),
            Score::Disqualified => None,
        }
    }

    pub fn is_disqualified(self) -> bool {
        matches!(self, Score::Disqualified)
    }

    pub fn scaled(self, factor: f64) -> Self {
        match self {
            Score::Value(value) => Score::Value(value * factor),
            Score::Disqualified => Score::Disqualified,
        }
    }

    /// Strictly positive value; what makes a same-pool edge worth adding
    pub fn is_positive(self) -> bool {
        self.value().is_some_and(|value| value > 0.0)
    }
}

impl Add for Score {
    type Output = Score;

    fn add(self, rhs: Score) -> Score {
        match (self, rhs) {
            (Score::Value(a), Score::Value(b)) => Score::Value(a + b),
            _ => Score::Disqualified,
        }
    }
}

/// Fold the two directions of a pair into one weight
pub fn merge_directions(forward: Score, reverse: Score, merge: DirectionMerge) -> Score {
    if merge == DirectionMerge::Forward {
        return forward;
    }
    match (forward, reverse) {
        (Score::Value(a), Score::Value(b)) => Score::Value(match merge {
            DirectionMerge::Sum => a + b,
            DirectionMerge::Mean => (a + b) / 2.0,
            DirectionMerge::Min => a.min(b),
            DirectionMerge::Forward => a,
        }),
        _ => Score::Disqualified,
    }
}

/// Combined directed scorer handed to every matrix worker
///
/// Holds only immutable configuration, so each worker gets its own clone
/// and no state is shared between cells.
#[derive(Debug, Clone)]
pub struct PairScorer {
    preference: PreferenceScorer,
    similarity: SimilarityScorer,
    policy: CompositionPolicy,
}

impl PairScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            preference: PreferenceScorer::new(config.preference.clone()),
            similarity: SimilarityScorer::new(config.similarity.clone()),
            policy: config.composition,
        }
    }

    pub fn policy(&self) -> CompositionPolicy {
        self.policy
    }

    pub fn preference(&self) -> &PreferenceScorer {
        &self.preference
    }

    pub fn similarity(&self) -> &SimilarityScorer {
        &self.similarity
    }

    /// Weighted preference plus similarity for the ordered pair (from, to).
    /// Similarity is skipped once preference has disqualified the pair.
    pub fn directed(
        &self,
        from: &EncodedApplicant,
        to: &EncodedApplicant,
    ) -> Result<Score, ScoreError> {
        let preference = self.preference.score(&from.applicant, &to.applicant)?;
        if preference.is_disqualified() {
            return Ok(Score::Disqualified);
        }

        let similarity = self.similarity.score(from, to)?;
        let combined = preference.scaled(self.policy.preference_weight)
            + Score::Value(similarity * self.policy.similarity_weight);

        match combined {
            Score::Value(value) => Score::finite(value, "combined"),
            Score::Disqualified => Ok(Score::Disqualified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disqualified_absorbs_addition() {
        assert_eq!(Score::Value(3.0) + Score::Value(4.0), Score::Value(7.0));
        assert_eq!(Score::Value(3.0) + Score::Disqualified, Score::Disqualified);
        assert_eq!(Score::Disqualified + Score::Value(3.0), Score::Disqualified);
    }

    #[test]
    fn test_finite_rejects_nan() {
        assert!(Score::finite(f64::NAN, "test").is_err());
        assert!(Score::finite(f64::NEG_INFINITY, "test").is_err());
        assert_eq!(Score::finite(1.5, "test").unwrap(), Score::Value(1.5));
    }

    #[test]
    fn test_merge_directions() {
        let a = Score::Value(10.0);
        let b = Score::Value(-4.0);
        assert_eq!(merge_directions(a, b, DirectionMerge::Sum), Score::Value(6.0));
        assert_eq!(merge_directions(a, b, DirectionMerge::Mean), Score::Value(3.0));
        assert_eq!(merge_directions(a, b, DirectionMerge::Min), Score::Value(-4.0));
        assert_eq!(merge_directions(a, b, DirectionMerge::Forward), a);
    }

    #[test]
    fn test_merge_disqualified_direction() {
        let a = Score::Value(10.0);
        assert_eq!(
            merge_directions(a, Score::Disqualified, DirectionMerge::Sum),
            Score::Disqualified
        );
        assert_eq!(
            merge_directions(a, Score::Disqualified, DirectionMerge::Forward),
            a
        );
        assert_eq!(
            merge_directions(Score::Disqualified, a, DirectionMerge::Min),
            Score::Disqualified
        );
    }

    #[test]
    fn test_positive_check() {
        assert!(Score::Value(0.1).is_positive());
        assert!(!Score::Value(0.0).is_positive());
        assert!(!Score::Value(-1.0).is_positive());
        assert!(!Score::Disqualified.is_positive());
    }
}
