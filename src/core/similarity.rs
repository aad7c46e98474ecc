use crate::config::{ListFieldWeights, ScalarFieldWeights, SimilarityConfig};
use crate::core::distance::cosine_similarity;
use crate::core::scoring::ScoreError;
use crate::models::{EncodedApplicant, ListField, ScalarField};

/// Embedding-based directed score over the free-text answers
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Base score plus one term per list field and per scalar field
    pub fn score(
        &self,
        from: &EncodedApplicant,
        to: &EncodedApplicant,
    ) -> Result<f64, ScoreError> {
        let mut total = self.config.base_score;

        for field in ListField::ALL {
            total += list_similarity(
                field.embeddings(&from.embeddings),
                field.embeddings(&to.embeddings),
                self.list_weights(field),
                field.name(),
            )?;
        }

        for field in ScalarField::ALL {
            total += scalar_similarity(
                field.embedding(&from.embeddings),
                field.embedding(&to.embeddings),
                self.scalar_weights(field),
                field.name(),
            )?;
        }

        if total.is_finite() {
            Ok(total)
        } else {
            Err(ScoreError::NonFinite("similarity"))
        }
    }

    fn list_weights(&self, field: ListField) -> &ListFieldWeights {
        match field {
            ListField::Hobbies => &self.config.hobbies,
            ListField::FavoriteMedia => &self.config.favorite_media,
        }
    }

    fn scalar_weights(&self, field: ScalarField) -> &ScalarFieldWeights {
        match field {
            ScalarField::Wish => &self.config.wish,
            ScalarField::WeekendPlan => &self.config.weekend_plan,
            ScalarField::Expectation => &self.config.expectation,
            ScalarField::Narrative => &self.config.narrative,
        }
    }
}

/// Best-match similarity of `from`'s phrases against `to`'s phrases
///
/// Each of `from`'s phrases is rewarded by its closest phrase on the other
/// side; the sum is divided by `sqrt(from.len())` so long lists do not win
/// on volume alone. An empty list on either side contributes nothing.
pub fn list_similarity(
    from: &[Vec<f32>],
    to: &[Vec<f32>],
    weights: &ListFieldWeights,
    field: &'static str,
) -> Result<f64, ScoreError> {
    if from.is_empty() || to.is_empty() {
        return Ok(0.0);
    }

    let mut total = 0.0;
    for phrase in from {
        let mut best = f64::NEG_INFINITY;
        for candidate in to {
            let similarity = cosine_similarity(phrase, candidate).ok_or(
                ScoreError::DimensionMismatch {
                    field,
                    left: phrase.len(),
                    right: candidate.len(),
                },
            )?;
            best = best.max(similarity);
        }

        let mut reward = best * weights.multiplier;
        if best >= weights.bonus_threshold {
            reward *= weights.bonus_multiplier;
        }
        total += reward;
    }

    Ok(total / (from.len() as f64).sqrt())
}

/// Similarity between two single-answer embeddings
///
/// The bonus for clearing the upper threshold wins over the lower-threshold
/// adjustment; at most one of them applies.
pub fn scalar_similarity(
    from: &[f32],
    to: &[f32],
    weights: &ScalarFieldWeights,
    field: &'static str,
) -> Result<f64, ScoreError> {
    let similarity = cosine_similarity(from, to).ok_or(ScoreError::DimensionMismatch {
        field,
        left: from.len(),
        right: to.len(),
    })?;

    let reward = similarity * weights.multiplier;
    Ok(if similarity >= weights.upper_threshold {
        reward * weights.bonus_multiplier
    } else if similarity < weights.lower_threshold {
        reward * (similarity - weights.lower_threshold) * weights.penalty_multiplier
    } else {
        reward
    })
}
