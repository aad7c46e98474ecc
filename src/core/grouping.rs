use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::models::{EncodedApplicant, PoolKind};

/// The applicant pool partitioned by (sex, preferred sex)
#[derive(Debug, Clone, Default)]
pub struct Pools {
    pub female_seeking_male: Vec<EncodedApplicant>,
    pub male_seeking_female: Vec<EncodedApplicant>,
    pub female_seeking_female: Vec<EncodedApplicant>,
    pub male_seeking_male: Vec<EncodedApplicant>,
}

impl Pools {
    pub fn get(&self, kind: PoolKind) -> &[EncodedApplicant] {
        match kind {
            PoolKind::FemaleSeekingMale => &self.female_seeking_male,
            PoolKind::MaleSeekingFemale => &self.male_seeking_female,
            PoolKind::FemaleSeekingFemale => &self.female_seeking_female,
            PoolKind::MaleSeekingMale => &self.male_seeking_male,
        }
    }

    fn get_mut(&mut self, kind: PoolKind) -> &mut Vec<EncodedApplicant> {
        match kind {
            PoolKind::FemaleSeekingMale => &mut self.female_seeking_male,
            PoolKind::MaleSeekingFemale => &mut self.male_seeking_female,
            PoolKind::FemaleSeekingFemale => &mut self.female_seeking_female,
            PoolKind::MaleSeekingMale => &mut self.male_seeking_male,
        }
    }

    /// Total applicants across all pools
    pub fn len(&self) -> usize {
        PoolKind::ALL.iter().map(|&kind| self.get(kind).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shuffle every pool so input order does not bias solver tie-breaks
    pub fn reshuffle(&mut self, seed: Option<u64>) {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        for kind in PoolKind::ALL {
            self.get_mut(kind).shuffle(&mut rng);
        }
    }
}

/// Split applicants into the four disjoint pools, keeping input order
pub fn separate_pools(applicants: Vec<EncodedApplicant>) -> Pools {
    let mut pools = Pools::default();
    for encoded in applicants {
        let kind = PoolKind::of(encoded.applicant.sex, encoded.applicant.preferred_sex);
        pools.get_mut(kind).push(encoded);
    }
    pools
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Applicant, Grade, Location, MbtiLetter, Sex, TextEmbeddings};
    use std::collections::HashSet;
    use uuid::Uuid;

    fn create_applicant(sex: Sex, preferred_sex: Sex) -> EncodedApplicant {
        EncodedApplicant {
            applicant: Applicant {
                id: Uuid::new_v4(),
                handle: "h".to_string(),
                sex,
                preferred_sex,
                grade: Grade::Ug1,
                school: "UST".to_string(),
                timezone: 0,
                location: Location::Uk,
                mbti_scores: [50; 4],
                preferred_mbti: [MbtiLetter::X; 4],
                acceptable_grades: vec![Grade::Ug1],
                acceptable_schools: vec!["UST".to_string()],
                max_time_difference: 0,
                same_location_only: false,
                preferred_partner: None,
                continue_match: true,
                reply_frequency: 1,
                hobbies: vec![],
                favorite_media: vec![],
                wish: String::new(),
                weekend_plan: String::new(),
                expectation: String::new(),
                narrative: String::new(),
            },
            embeddings: TextEmbeddings::default(),
        }
    }

    fn sample() -> Vec<EncodedApplicant> {
        vec![
            create_applicant(Sex::Female, Sex::Male),
            create_applicant(Sex::Male, Sex::Female),
            create_applicant(Sex::Female, Sex::Female),
            create_applicant(Sex::Male, Sex::Male),
            create_applicant(Sex::Female, Sex::Male),
            create_applicant(Sex::Male, Sex::Male),
            create_applicant(Sex::Male, Sex::Male),
        ]
    }

    #[test]
    fn test_every_applicant_lands_in_exactly_one_pool() {
        let applicants = sample();
        let ids: HashSet<Uuid> = applicants.iter().map(|a| a.applicant.id).collect();

        let pools = separate_pools(applicants);

        assert_eq!(pools.len(), 7);
        assert_eq!(pools.female_seeking_male.len(), 2);
        assert_eq!(pools.male_seeking_female.len(), 1);
        assert_eq!(pools.female_seeking_female.len(), 1);
        assert_eq!(pools.male_seeking_male.len(), 3);

        let pooled: HashSet<Uuid> = PoolKind::ALL
            .iter()
            .flat_map(|&kind| pools.get(kind).iter().map(|a| a.applicant.id))
            .collect();
        assert_eq!(pooled, ids);

        for kind in PoolKind::ALL {
            for member in pools.get(kind) {
                assert_eq!(PoolKind::of(member.applicant.sex, member.applicant.preferred_sex), kind);
            }
        }
    }

    #[test]
    fn test_seeded_reshuffle_is_reproducible_and_lossless() {
        let mut many: Vec<EncodedApplicant> = (0..20)
            .map(|_| create_applicant(Sex::Male, Sex::Male))
            .collect();
        many.extend(sample());

        let mut first = separate_pools(many.clone());
        let mut second = separate_pools(many);
        let before: HashSet<Uuid> = first.male_seeking_male.iter().map(|a| a.applicant.id).collect();

        first.reshuffle(Some(7));
        second.reshuffle(Some(7));

        let order = |pools: &Pools| -> Vec<Uuid> {
            pools.male_seeking_male.iter().map(|a| a.applicant.id).collect()
        };
        assert_eq!(order(&first), order(&second));

        let after: HashSet<Uuid> = order(&first).into_iter().collect();
        assert_eq!(before, after);
        assert_eq!(first.len(), 27);
    }
}
