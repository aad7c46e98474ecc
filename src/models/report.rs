use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::PoolKind;

/// A committed pairing between two applicants, mapped back to their ids
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRecord {
    /// Index of the first applicant within its pool
    #[serde(rename = "firstIndex")]
    pub first_index: usize,
    #[serde(rename = "secondIndex")]
    pub second_index: usize,
    #[serde(rename = "firstId")]
    pub first_id: Uuid,
    #[serde(rename = "secondId")]
    pub second_id: Uuid,
    /// Realized weight the solver optimized for this pair
    pub score: f64,
}

/// An applicant the solver could not place
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmatchedRecord {
    #[serde(rename = "applicantId")]
    pub applicant_id: Uuid,
    pub pool: PoolKind,
    pub reason: UnmatchedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedReason {
    /// Paired with a padding slot: the other side had fewer applicants
    /// or no real counterpart beat an empty slot
    NoCounterpart,
    /// Paired only because every remaining option was disqualified
    ForcedDisqualified,
    /// Left out by the same-pool matching
    NotSelected,
}

/// Output of one matching round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    #[serde(rename = "generatedAt")]
    pub generated_at: chrono::DateTime<chrono::Utc>,
    #[serde(rename = "totalApplicants")]
    pub total_applicants: usize,
    /// Female-seeking-male × male-seeking-female pairs
    #[serde(rename = "oppositeSex")]
    pub opposite_sex: Vec<PairRecord>,
    #[serde(rename = "femaleSameSex")]
    pub female_same_sex: Vec<PairRecord>,
    #[serde(rename = "maleSameSex")]
    pub male_same_sex: Vec<PairRecord>,
    pub unmatched: Vec<UnmatchedRecord>,
}

impl RoundReport {
    pub fn pair_count(&self) -> usize {
        self.opposite_sex.len() + self.female_same_sex.len() + self.male_same_sex.len()
    }
}
