use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ScoringConfig, Settings};
use crate::core::{
    embedding::encode_applicants,
    grouping::{separate_pools, Pools},
    matrix::{bipartite_weights, same_pool_weights, MatrixError},
    scoring::PairScorer,
};
use crate::models::{
    Applicant, EncodedApplicant, PairRecord, PoolKind, RoundReport, UnmatchedReason,
    UnmatchedRecord,
};
use crate::services::encoder::{EncoderError, TextEncoder};
use crate::services::snapshot::SnapshotError;
use crate::solver::{assign_bipartite, match_same_pool, SolverError};

/// Any failure that aborts a matching round
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Scoring error: {0}")]
    Matrix(#[from] MatrixError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

/// Pairs and leftovers of one pool (or pool pair)
#[derive(Debug, Default)]
pub struct PoolOutcome {
    pub pairs: Vec<PairRecord>,
    pub unmatched: Vec<UnmatchedRecord>,
}

/// Runs one matching round end to end
///
/// # Pipeline Stages
/// 1. Encode free-text fields
/// 2. Separate into the four (sex, preferred sex) pools
/// 3. Optionally reshuffle each pool
/// 4. Score female-seeking-male against male-seeking-female and assign
/// 5. Score and match each same-sex pool internally
#[derive(Debug, Clone)]
pub struct RoundMatcher {
    scorer: PairScorer,
    workers: Option<usize>,
    reshuffle: bool,
    seed: Option<u64>,
}

impl RoundMatcher {
    pub fn new(scoring: &ScoringConfig) -> Self {
        Self {
            scorer: PairScorer::new(scoring),
            workers: None,
            reshuffle: false,
            seed: None,
        }
    }

    pub fn with_default_config() -> Self {
        Self::new(&ScoringConfig::default())
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let matcher = Self::new(&settings.scoring).with_workers(settings.run.workers);
        if settings.run.reshuffle {
            matcher.with_reshuffle(settings.run.seed)
        } else {
            matcher
        }
    }

    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers;
        self
    }

    /// Shuffle pools before scoring; a seed makes the order reproducible
    pub fn with_reshuffle(mut self, seed: Option<u64>) -> Self {
        self.reshuffle = true;
        self.seed = seed;
        self
    }

    pub fn scorer(&self) -> &PairScorer {
        &self.scorer
    }

    /// Encode, pool, score and solve the given applicants
    pub async fn run<E: TextEncoder>(
        &self,
        encoder: &E,
        applicants: Vec<Applicant>,
    ) -> Result<RoundReport, PipelineError> {
        info!("Encoding {} applicants", applicants.len());
        let encoded = encode_applicants(encoder, applicants).await?;
        self.match_encoded(encoded)
    }

    /// Everything after encoding; synchronous and CPU bound
    pub fn match_encoded(&self, encoded: Vec<EncodedApplicant>) -> Result<RoundReport, PipelineError> {
        let total_applicants = encoded.len();
        let mut pools = separate_pools(encoded);
        for kind in PoolKind::ALL {
            info!("Pool {:?}: {} applicants", kind, pools.get(kind).len());
        }

        if self.reshuffle {
            pools.reshuffle(self.seed);
            debug!("Pools reshuffled (seed: {:?})", self.seed);
        }

        let opposite = self.match_opposite_sex(&pools)?;
        let female = self.match_same_sex(&pools, PoolKind::FemaleSeekingFemale)?;
        let male = self.match_same_sex(&pools, PoolKind::MaleSeekingMale)?;

        let mut unmatched = opposite.unmatched;
        unmatched.extend(female.unmatched);
        unmatched.extend(male.unmatched);

        let report = RoundReport {
            generated_at: Utc::now(),
            total_applicants,
            opposite_sex: opposite.pairs,
            female_same_sex: female.pairs,
            male_same_sex: male.pairs,
            unmatched,
        };

        info!(
            "Round complete: {} pairs, {} unmatched",
            report.pair_count(),
            report.unmatched.len()
        );
        Ok(report)
    }

    /// Hungarian assignment between the two opposite-sex pools
    pub fn match_opposite_sex(&self, pools: &Pools) -> Result<PoolOutcome, PipelineError> {
        let left = pools.get(PoolKind::FemaleSeekingMale);
        let right = pools.get(PoolKind::MaleSeekingFemale);
        let mut outcome = PoolOutcome::default();
        if left.is_empty() && right.is_empty() {
            return Ok(outcome);
        }

        let weights = bipartite_weights(left, right, &self.scorer, self.workers)?;
        let assignment = assign_bipartite(&weights)?;

        for pair in &assignment.pairs {
            if pair.is_real() {
                if let Some(score) = pair.score.value() {
                    outcome.pairs.push(PairRecord {
                        first_index: pair.row,
                        second_index: pair.col,
                        first_id: left[pair.row].applicant.id,
                        second_id: right[pair.col].applicant.id,
                        score,
                    });
                }
                continue;
            }

            let reason = if pair.forced {
                UnmatchedReason::ForcedDisqualified
            } else {
                UnmatchedReason::NoCounterpart
            };
            if let Some(member) = left.get(pair.row) {
                outcome.unmatched.push(unmatched(member, PoolKind::FemaleSeekingMale, reason));
            }
            if let Some(member) = right.get(pair.col) {
                outcome.unmatched.push(unmatched(member, PoolKind::MaleSeekingFemale, reason));
            }
        }

        let forced = assignment.forced_pairs().count();
        if forced > 0 {
            warn!("{} opposite-sex assignments were disqualified and left unconfirmed", forced);
        }
        info!(
            "Opposite-sex: {} pairs from {}x{} pools",
            outcome.pairs.len(),
            left.len(),
            right.len()
        );
        Ok(outcome)
    }

    /// Maximum-weight matching inside one same-sex pool
    pub fn match_same_sex(&self, pools: &Pools, kind: PoolKind) -> Result<PoolOutcome, PipelineError> {
        let members = pools.get(kind);
        let mut outcome = PoolOutcome::default();
        if members.is_empty() {
            return Ok(outcome);
        }

        let weights = same_pool_weights(members, &self.scorer, self.workers)?;
        let matched = match_same_pool(&weights)?;

        let mut paired = vec![false; members.len()];
        for pair in matched {
            paired[pair.a] = true;
            paired[pair.b] = true;
            outcome.pairs.push(PairRecord {
                first_index: pair.a,
                second_index: pair.b,
                first_id: members[pair.a].applicant.id,
                second_id: members[pair.b].applicant.id,
                score: pair.weight,
            });
        }

        outcome.unmatched = members
            .iter()
            .enumerate()
            .filter(|(index, _)| !paired[*index])
            .map(|(_, member)| unmatched(member, kind, UnmatchedReason::NotSelected))
            .collect();

        info!(
            "{:?}: {} pairs, {} left unmatched",
            kind,
            outcome.pairs.len(),
            outcome.unmatched.len()
        );
        Ok(outcome)
    }
}

impl Default for RoundMatcher {
    fn default() -> Self {
        Self::with_default_config()
    }
}

fn unmatched(member: &EncodedApplicant, pool: PoolKind, reason: UnmatchedReason) -> UnmatchedRecord {
    UnmatchedRecord {
        applicant_id: member.applicant.id,
        pool,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, Location, MbtiLetter, Sex, TextEmbeddings};
    use crate::services::encoder::HashingEncoder;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn create_test_applicant(handle: &str, sex: Sex, preferred_sex: Sex) -> Applicant {
        Applicant {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            sex,
            preferred_sex,
            grade: Grade::Ug2,
            school: "HKU".to_string(),
            timezone: 8,
            location: Location::Hk,
            mbti_scores: [50; 4],
            preferred_mbti: [MbtiLetter::X; 4],
            acceptable_grades: vec![Grade::Ug1, Grade::Ug2, Grade::Ug3],
            acceptable_schools: vec!["HKU".to_string(), "UST".to_string()],
            max_time_difference: 2,
            same_location_only: false,
            preferred_partner: None,
            continue_match: true,
            reply_frequency: 3,
            hobbies: vec![],
            favorite_media: vec![],
            wish: String::new(),
            weekend_plan: String::new(),
            expectation: String::new(),
            narrative: String::new(),
        }
    }

    fn encode(applicants: Vec<Applicant>) -> Vec<EncodedApplicant> {
        applicants
            .into_iter()
            .map(|applicant| EncodedApplicant {
                applicant,
                embeddings: TextEmbeddings::default(),
            })
            .collect()
    }

    #[test]
    fn test_extra_female_is_left_without_counterpart() {
        let f1 = create_test_applicant("f1", Sex::Female, Sex::Male);
        let mut f2 = create_test_applicant("f2", Sex::Female, Sex::Male);
        f2.acceptable_schools = vec!["UST".to_string()];
        let m = create_test_applicant("m", Sex::Male, Sex::Female);
        let (f1_id, f2_id, m_id) = (f1.id, f2.id, m.id);

        let report = RoundMatcher::default()
            .match_encoded(encode(vec![f1, f2, m]))
            .unwrap();

        assert_eq!(report.opposite_sex.len(), 1);
        assert_eq!(report.opposite_sex[0].first_id, f1_id);
        assert_eq!(report.opposite_sex[0].second_id, m_id);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].applicant_id, f2_id);
        assert_eq!(report.unmatched[0].reason, UnmatchedReason::NoCounterpart);
    }

    #[test]
    fn test_forced_pair_is_not_confirmed() {
        let mut f = create_test_applicant("f", Sex::Female, Sex::Male);
        f.continue_match = false;
        let m = create_test_applicant("m", Sex::Male, Sex::Female);

        let report = RoundMatcher::default().match_encoded(encode(vec![f, m])).unwrap();

        assert!(report.opposite_sex.is_empty());
        assert_eq!(report.unmatched.len(), 2);
        assert!(report
            .unmatched
            .iter()
            .all(|record| record.reason == UnmatchedReason::ForcedDisqualified));
    }

    #[test]
    fn test_same_sex_pool_leaves_disqualified_member_out() {
        let a = create_test_applicant("a", Sex::Female, Sex::Female);
        let b = create_test_applicant("b", Sex::Female, Sex::Female);
        let mut c = create_test_applicant("c", Sex::Female, Sex::Female);
        c.continue_match = false;
        let c_id = c.id;

        let report = RoundMatcher::default().match_encoded(encode(vec![a, b, c])).unwrap();

        assert_eq!(report.female_same_sex.len(), 1);
        let pair = &report.female_same_sex[0];
        assert!(pair.score > 0.0);
        assert_ne!(pair.first_id, c_id);
        assert_ne!(pair.second_id, c_id);
        assert_eq!(report.unmatched.len(), 1);
        assert_eq!(report.unmatched[0].applicant_id, c_id);
        assert_eq!(report.unmatched[0].pool, PoolKind::FemaleSeekingFemale);
        assert_eq!(report.unmatched[0].reason, UnmatchedReason::NotSelected);
    }

    #[test]
    fn test_unscorable_pair_aborts_the_round() {
        let mut f = create_test_applicant("f", Sex::Female, Sex::Male);
        f.acceptable_grades.push(Grade::Prof);
        let mut m = create_test_applicant("m", Sex::Male, Sex::Female);
        m.grade = Grade::Prof;

        let result = RoundMatcher::default().match_encoded(encode(vec![f, m]));
        assert!(matches!(
            result,
            Err(PipelineError::Matrix(MatrixError::Cell { .. }))
        ));
    }

    #[tokio::test]
    async fn test_run_places_every_applicant_once() {
        let mut applicants = Vec::new();
        for i in 0..4 {
            applicants.push(create_test_applicant(&format!("f{}", i), Sex::Female, Sex::Male));
        }
        for i in 0..3 {
            applicants.push(create_test_applicant(&format!("m{}", i), Sex::Male, Sex::Female));
        }
        for i in 0..5 {
            applicants.push(create_test_applicant(&format!("mm{}", i), Sex::Male, Sex::Male));
        }
        for applicant in applicants.iter_mut() {
            applicant.hobbies = vec!["hiking".to_string(), "board games".to_string()];
            applicant.wish = "meet someone kind".to_string();
        }
        let ids: HashSet<Uuid> = applicants.iter().map(|a| a.id).collect();

        let report = RoundMatcher::default()
            .with_workers(Some(2))
            .with_reshuffle(Some(11))
            .run(&HashingEncoder::new(32), applicants)
            .await
            .unwrap();

        assert_eq!(report.total_applicants, 12);
        assert_eq!(report.opposite_sex.len(), 3);
        assert_eq!(report.male_same_sex.len(), 2);
        assert!(report.female_same_sex.is_empty());

        let mut seen = HashSet::new();
        let pairs = report
            .opposite_sex
            .iter()
            .chain(&report.female_same_sex)
            .chain(&report.male_same_sex);
        for pair in pairs {
            assert!(seen.insert(pair.first_id));
            assert!(seen.insert(pair.second_id));
        }
        for record in &report.unmatched {
            assert!(seen.insert(record.applicant_id));
        }
        assert_eq!(seen, ids);
    }
}
