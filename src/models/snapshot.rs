use serde::de::{self, Deserializer, IntoDeserializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::domain::{Applicant, Grade, Location, MbtiLetter, Sex, MBTI_AXES};

/// Raw applicant row as exported by the event application
///
/// Accepts both the application's column names (`wxid`, `fav_movies`, ...)
/// and the engine's own names, pipe-joined (`"UG1 | UG2"`) or array list
/// columns, and `"UTC+8"` style timezones.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_mbti_preferences"))]
pub struct ApplicantRow {
    pub id: Uuid,
    #[validate(length(min = 1, max = 50))]
    #[serde(alias = "wxid")]
    pub handle: String,
    pub sex: Sex,
    pub preferred_sex: Sex,
    pub grade: Grade,
    #[validate(length(min = 1))]
    pub school: String,
    #[validate(range(min = -12, max = 14))]
    #[serde(deserialize_with = "de_timezone")]
    pub timezone: i32,
    pub location: Location,

    #[validate(range(max = 100))]
    pub mbti_ei: u8,
    #[validate(range(max = 100))]
    pub mbti_sn: u8,
    #[validate(range(max = 100))]
    pub mbti_tf: u8,
    #[validate(range(max = 100))]
    pub mbti_jp: u8,
    pub preferred_mbti_ei: MbtiLetter,
    pub preferred_mbti_sn: MbtiLetter,
    pub preferred_mbti_tf: MbtiLetter,
    pub preferred_mbti_jp: MbtiLetter,

    #[serde(alias = "preferred_grades", deserialize_with = "de_pipe_list")]
    pub acceptable_grades: Vec<Grade>,
    #[serde(alias = "preferred_schools", deserialize_with = "de_pipe_list")]
    pub acceptable_schools: Vec<String>,
    #[validate(range(max = 12))]
    pub max_time_difference: u8,
    #[serde(default, deserialize_with = "de_flag")]
    pub same_location_only: bool,
    #[serde(default, alias = "preferred_wxid")]
    pub preferred_partner: Option<String>,
    #[serde(default = "default_true", deserialize_with = "de_flag")]
    pub continue_match: bool,
    #[validate(range(min = 1, max = 5))]
    #[serde(deserialize_with = "de_ordinal")]
    pub reply_frequency: u8,

    #[serde(default, deserialize_with = "de_pipe_list")]
    pub hobbies: Vec<String>,
    #[serde(default, alias = "fav_movies", deserialize_with = "de_pipe_list")]
    pub favorite_media: Vec<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub wish: String,
    #[serde(default, alias = "weekend_arrangement", deserialize_with = "de_text")]
    pub weekend_plan: String,
    #[serde(default, deserialize_with = "de_text")]
    pub expectation: String,
    #[serde(default, alias = "why_lamp_remembered_your_name", deserialize_with = "de_text")]
    pub narrative: String,

    // Eligibility bookkeeping, not carried into the applicant record
    #[serde(default, deserialize_with = "de_flag")]
    pub quitted: bool,
    #[serde(default, deserialize_with = "de_flag")]
    pub exclude: bool,
    #[serde(default)]
    pub payment_id: Option<serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl ApplicantRow {
    /// Deposit confirmed
    pub fn has_paid(&self) -> bool {
        self.payment_id.as_ref().is_some_and(|id| !id.is_null())
    }

    /// Non-withdrawn, non-excluded, paid applicants in a matchable grade
    pub fn is_eligible(&self) -> bool {
        !self.quitted && !self.exclude && self.has_paid() && self.grade.is_matchable()
    }

    pub fn into_applicant(self) -> Applicant {
        let preferred_partner = self
            .preferred_partner
            .map(|handle| handle.trim().to_string())
            .filter(|handle| !handle.is_empty());

        Applicant {
            id: self.id,
            handle: self.handle.trim().to_string(),
            sex: self.sex,
            preferred_sex: self.preferred_sex,
            grade: self.grade,
            school: self.school,
            timezone: self.timezone,
            location: self.location,
            mbti_scores: [self.mbti_ei, self.mbti_sn, self.mbti_tf, self.mbti_jp],
            preferred_mbti: [
                self.preferred_mbti_ei,
                self.preferred_mbti_sn,
                self.preferred_mbti_tf,
                self.preferred_mbti_jp,
            ],
            acceptable_grades: self.acceptable_grades,
            acceptable_schools: self.acceptable_schools,
            max_time_difference: self.max_time_difference,
            same_location_only: self.same_location_only,
            preferred_partner,
            continue_match: self.continue_match,
            reply_frequency: self.reply_frequency,
            hobbies: self.hobbies,
            favorite_media: self.favorite_media,
            wish: self.wish,
            weekend_plan: self.weekend_plan,
            expectation: self.expectation,
            narrative: self.narrative,
        }
    }
}

fn validate_mbti_preferences(row: &ApplicantRow) -> Result<(), ValidationError> {
    let letters = [
        row.preferred_mbti_ei,
        row.preferred_mbti_sn,
        row.preferred_mbti_tf,
        row.preferred_mbti_jp,
    ];
    if letters
        .iter()
        .zip(MBTI_AXES)
        .all(|(letter, axis)| letter.belongs_to(axis))
    {
        Ok(())
    } else {
        Err(ValidationError::new("mbti_letter_axis_mismatch"))
    }
}

/// Parse `"UTC+8"`, `"GMT-5"`, `"+3"` or a bare integer into an hour offset
pub fn parse_timezone(raw: &str) -> Option<i32> {
    let upper = raw.trim().to_ascii_uppercase();
    let (prefixed, offset) = match upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
    {
        Some(rest) => (true, rest.trim()),
        None => (false, upper.as_str()),
    };

    if offset.is_empty() {
        return prefixed.then_some(0);
    }
    offset.strip_prefix('+').unwrap_or(offset).parse().ok()
}

fn de_timezone<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Hours(i32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Hours(hours) => Ok(hours),
        Raw::Text(text) => parse_timezone(&text)
            .ok_or_else(|| de::Error::custom(format!("unparseable timezone: {:?}", text))),
    }
}

fn de_pipe_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw<T> {
        Items(Vec<T>),
        Joined(String),
        Missing(()),
    }

    match Raw::<T>::deserialize(deserializer)? {
        Raw::Items(items) => Ok(items),
        Raw::Missing(()) => Ok(Vec::new()),
        Raw::Joined(joined) => joined
            .split('|')
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(|piece| {
                let owned: String = piece.to_string();
                T::deserialize(owned.into_deserializer())
            })
            .collect(),
    }
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Bool(flag) => Ok(flag),
        Raw::Int(0) => Ok(false),
        Raw::Int(1) => Ok(true),
        Raw::Int(other) => Err(de::Error::custom(format!("invalid flag value: {}", other))),
    }
}

fn de_ordinal<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(u8),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid ordinal: {:?}", text))),
    }
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
