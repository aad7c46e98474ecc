use crate::config::PreferenceConfig;
use crate::core::distance::circular_time_distance;
use crate::core::scoring::{Score, ScoreError};
use crate::models::{Applicant, Grade, Location};

/// Hard constraint that rules a candidate out for a requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disqualification {
    GradeNotAccepted,
    SchoolNotAccepted,
    DifferentLocation,
    NotContinuing,
    TimeDifference,
}

/// Check the requester's hard constraints against a candidate
///
/// Returns the first violated constraint, if any.
pub fn disqualification(from: &Applicant, to: &Applicant) -> Option<Disqualification> {
    if !from.continue_match {
        return Some(Disqualification::NotContinuing);
    }

    if !from.acceptable_grades.contains(&to.grade) {
        return Some(Disqualification::GradeNotAccepted);
    }

    if !from.acceptable_schools.iter().any(|school| school == &to.school) {
        return Some(Disqualification::SchoolNotAccepted);
    }

    if from.same_location_only && to.location != from.location {
        return Some(Disqualification::DifferentLocation);
    }

    let time_distance = circular_time_distance(from.timezone, to.timezone);
    if time_distance > u32::from(from.max_time_difference) {
        return Some(Disqualification::TimeDifference);
    }

    None
}

/// Rule-based directed score over the structured application fields
#[derive(Debug, Clone)]
pub struct PreferenceScorer {
    config: PreferenceConfig,
}

impl PreferenceScorer {
    pub fn new(config: PreferenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreferenceConfig {
        &self.config
    }

    /// Score how well `to` fits what `from` asked for
    ///
    /// A directly named partner short-circuits everything, including hard
    /// constraints. Otherwise any violated hard constraint disqualifies the
    /// pair before soft terms are evaluated.
    pub fn score(&self, from: &Applicant, to: &Applicant) -> Result<Score, ScoreError> {
        if from.names_as_partner(to) {
            return Ok(Score::Value(self.config.preferred_partner_score));
        }

        if disqualification(from, to).is_some() {
            return Ok(Score::Disqualified);
        }

        let time_distance = circular_time_distance(from.timezone, to.timezone);

        let mut score = self.config.base_score;
        score += self.timezone_penalty(time_distance);
        score += self.mbti_score(from, to);
        score += self.location_score(from.location, to.location);
        score += self.grade_penalty(from.grade, to.grade)?;
        score += self.reply_frequency_reward(to.reply_frequency)?;

        Score::finite(score, "preference")
    }

    #[inline]
    fn timezone_penalty(&self, hours: u32) -> f64 {
        escalated(
            self.config.timezone_base_penalty,
            f64::from(hours),
            self.config.timezone_escalation_threshold,
            self.config.timezone_escalation_multiplier,
        )
    }

    /// Each axis pulls the candidate's score towards the requested pole
    fn mbti_score(&self, from: &Applicant, to: &Applicant) -> f64 {
        from.preferred_mbti
            .iter()
            .zip(to.mbti_scores.iter())
            .map(|(letter, &axis_score)| {
                self.config.mbti_multiplier
                    * letter.sign()
                    * self.config.mbti_transform.apply(f64::from(axis_score))
            })
            .sum()
    }

    fn location_score(&self, from: Location, to: Location) -> f64 {
        if from == to {
            return self.config.same_location_reward;
        }

        let group_distance = from.region_group().abs_diff(to.region_group());
        if group_distance == 0 {
            self.config.same_location_group_reward
        } else {
            self.config.location_group_distance_penalty * f64::from(group_distance)
        }
    }

    fn grade_penalty(&self, from: Grade, to: Grade) -> Result<f64, ScoreError> {
        let from_ordinal = from.ordinal().ok_or(ScoreError::UnmappedGrade(from))?;
        let to_ordinal = to.ordinal().ok_or(ScoreError::UnmappedGrade(to))?;

        Ok(escalated(
            self.config.grade_base_penalty,
            (from_ordinal - to_ordinal).abs(),
            self.config.grade_escalation_threshold,
            self.config.grade_escalation_multiplier,
        ))
    }

    fn reply_frequency_reward(&self, frequency: u8) -> Result<f64, ScoreError> {
        frequency
            .checked_sub(1)
            .and_then(|index| self.config.reply_frequency_rewards.get(usize::from(index)))
            .copied()
            .ok_or(ScoreError::ReplyFrequency(frequency))
    }
}

/// `base * distance`, multiplied again once `distance` reaches `threshold`
#[inline]
fn escalated(base: f64, distance: f64, threshold: f64, multiplier: f64) -> f64 {
    let penalty = base * distance;
    if distance >= threshold {
        penalty * multiplier
    } else {
        penalty
    }
}
