use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Applicant sex, also used for the preferred partner sex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

/// Disjoint applicant pool keyed by (sex, preferred sex)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    FemaleSeekingMale,
    MaleSeekingFemale,
    FemaleSeekingFemale,
    MaleSeekingMale,
}

impl PoolKind {
    pub const ALL: [PoolKind; 4] = [
        PoolKind::FemaleSeekingMale,
        PoolKind::MaleSeekingFemale,
        PoolKind::FemaleSeekingFemale,
        PoolKind::MaleSeekingMale,
    ];

    pub fn of(sex: Sex, preferred_sex: Sex) -> Self {
        match (sex, preferred_sex) {
            (Sex::Female, Sex::Male) => PoolKind::FemaleSeekingMale,
            (Sex::Male, Sex::Female) => PoolKind::MaleSeekingFemale,
            (Sex::Female, Sex::Female) => PoolKind::FemaleSeekingFemale,
            (Sex::Male, Sex::Male) => PoolKind::MaleSeekingMale,
        }
    }

    pub fn is_same_sex(self) -> bool {
        matches!(self, PoolKind::FemaleSeekingFemale | PoolKind::MaleSeekingMale)
    }
}

/// Study grade as submitted on the application form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Grade {
    Ug1,
    Ug2,
    Ug3,
    Ug4,
    Ug5,
    Ms,
    Phd,
    Grad,
    Prof,
}

impl Grade {
    /// Ordinal used for grade distance. Professors have no ordinal and are
    /// never matchable.
    pub fn ordinal(self) -> Option<f64> {
        match self {
            Grade::Ug1 => Some(1.0),
            Grade::Ug2 => Some(2.0),
            Grade::Ug3 => Some(3.0),
            Grade::Ug4 => Some(4.0),
            Grade::Ug5 => Some(4.5),
            Grade::Ms => Some(6.0),
            Grade::Phd => Some(7.0),
            Grade::Grad => Some(8.0),
            Grade::Prof => None,
        }
    }

    /// Grades excluded from a matching round altogether
    pub fn is_matchable(self) -> bool {
        !matches!(self, Grade::Prof | Grade::Grad)
    }
}

/// Where the applicant will spend the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Hk,
    Sz,
    Gd,
    Cn,
    Tw,
    JpKr,
    Asia,
    Oceania,
    Uk,
    Eu,
    Us,
    Ca,
    Na,
    Other,
}

impl Location {
    /// Ordinal region group. Locations sharing a group are "close", and the
    /// absolute group difference is used as a rough distance.
    pub fn region_group(self) -> u8 {
        match self {
            Location::Hk => 0,
            Location::Sz | Location::Gd => 1,
            Location::Cn | Location::Tw | Location::JpKr => 2,
            Location::Asia | Location::Oceania => 3,
            Location::Uk | Location::Eu => 4,
            Location::Us | Location::Ca | Location::Na => 5,
            Location::Other => 6,
        }
    }
}

/// One of the four MBTI axes, in applicant field order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbtiAxis {
    EnergyEi,
    PerceptionSn,
    JudgementTf,
    LifestyleJp,
}

pub const MBTI_AXES: [MbtiAxis; 4] = [
    MbtiAxis::EnergyEi,
    MbtiAxis::PerceptionSn,
    MbtiAxis::JudgementTf,
    MbtiAxis::LifestyleJp,
];

/// Preferred MBTI letter for one axis; `x` means no preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MbtiLetter {
    E,
    I,
    S,
    N,
    T,
    F,
    J,
    P,
    X,
}

impl MbtiLetter {
    /// Direction in which this letter pulls the partner's axis score.
    /// Axis scores grow towards i, n, f and p.
    pub fn sign(self) -> f64 {
        match self {
            MbtiLetter::E | MbtiLetter::S | MbtiLetter::T | MbtiLetter::J => -1.0,
            MbtiLetter::I | MbtiLetter::N | MbtiLetter::F | MbtiLetter::P => 1.0,
            MbtiLetter::X => 0.0,
        }
    }

    /// Whether the letter is a valid preference for the given axis
    pub fn belongs_to(self, axis: MbtiAxis) -> bool {
        matches!(
            (self, axis),
            (MbtiLetter::X, _)
                | (MbtiLetter::E | MbtiLetter::I, MbtiAxis::EnergyEi)
                | (MbtiLetter::S | MbtiLetter::N, MbtiAxis::PerceptionSn)
                | (MbtiLetter::T | MbtiLetter::F, MbtiAxis::JudgementTf)
                | (MbtiLetter::J | MbtiLetter::P, MbtiAxis::LifestyleJp)
        )
    }
}

/// Read-only applicant snapshot used for one matching run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Applicant {
    pub id: Uuid,
    pub handle: String,
    pub sex: Sex,
    pub preferred_sex: Sex,
    pub grade: Grade,
    pub school: String,
    /// UTC offset in whole hours
    pub timezone: i32,
    pub location: Location,
    /// Axis scores (EI, SN, TF, JP), each 0..=100
    pub mbti_scores: [u8; 4],
    pub preferred_mbti: [MbtiLetter; 4],
    pub acceptable_grades: Vec<Grade>,
    pub acceptable_schools: Vec<String>,
    pub max_time_difference: u8,
    pub same_location_only: bool,
    pub preferred_partner: Option<String>,
    pub continue_match: bool,
    /// 1 (do-not-disturb) ..= 5 (always online)
    pub reply_frequency: u8,
    pub hobbies: Vec<String>,
    pub favorite_media: Vec<String>,
    pub wish: String,
    pub weekend_plan: String,
    pub expectation: String,
    pub narrative: String,
}

impl Applicant {
    /// Whether `other` is the partner this applicant named directly
    pub fn names_as_partner(&self, other: &Applicant) -> bool {
        self.preferred_partner
            .as_deref()
            .map(str::trim)
            .is_some_and(|handle| !handle.is_empty() && handle == other.handle)
    }
}

/// Phrase-list free-text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Hobbies,
    FavoriteMedia,
}

impl ListField {
    pub const ALL: [ListField; 2] = [ListField::Hobbies, ListField::FavoriteMedia];

    pub fn name(self) -> &'static str {
        match self {
            ListField::Hobbies => "hobbies",
            ListField::FavoriteMedia => "favorite_media",
        }
    }

    pub fn phrases(self, applicant: &Applicant) -> &[String] {
        match self {
            ListField::Hobbies => &applicant.hobbies,
            ListField::FavoriteMedia => &applicant.favorite_media,
        }
    }

    pub fn embeddings(self, embeddings: &TextEmbeddings) -> &[Vec<f32>] {
        match self {
            ListField::Hobbies => &embeddings.hobbies,
            ListField::FavoriteMedia => &embeddings.favorite_media,
        }
    }

    pub(crate) fn embeddings_mut(self, embeddings: &mut TextEmbeddings) -> &mut Vec<Vec<f32>> {
        match self {
            ListField::Hobbies => &mut embeddings.hobbies,
            ListField::FavoriteMedia => &mut embeddings.favorite_media,
        }
    }
}

/// Single-answer free-text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarField {
    Wish,
    WeekendPlan,
    Expectation,
    Narrative,
}

impl ScalarField {
    pub const ALL: [ScalarField; 4] = [
        ScalarField::Wish,
        ScalarField::WeekendPlan,
        ScalarField::Expectation,
        ScalarField::Narrative,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScalarField::Wish => "wish",
            ScalarField::WeekendPlan => "weekend_plan",
            ScalarField::Expectation => "expectation",
            ScalarField::Narrative => "narrative",
        }
    }

    pub fn text(self, applicant: &Applicant) -> &str {
        match self {
            ScalarField::Wish => &applicant.wish,
            ScalarField::WeekendPlan => &applicant.weekend_plan,
            ScalarField::Expectation => &applicant.expectation,
            ScalarField::Narrative => &applicant.narrative,
        }
    }

    pub fn embedding(self, embeddings: &TextEmbeddings) -> &[f32] {
        match self {
            ScalarField::Wish => &embeddings.wish,
            ScalarField::WeekendPlan => &embeddings.weekend_plan,
            ScalarField::Expectation => &embeddings.expectation,
            ScalarField::Narrative => &embeddings.narrative,
        }
    }

    pub(crate) fn embedding_mut(self, embeddings: &mut TextEmbeddings) -> &mut Vec<f32> {
        match self {
            ScalarField::Wish => &mut embeddings.wish,
            ScalarField::WeekendPlan => &mut embeddings.weekend_plan,
            ScalarField::Expectation => &mut embeddings.expectation,
            ScalarField::Narrative => &mut embeddings.narrative,
        }
    }
}

/// Embedding vectors derived from an applicant's free-text fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextEmbeddings {
    /// One vector per hobby phrase, in phrase order
    pub hobbies: Vec<Vec<f32>>,
    /// One vector per favorite media phrase, in phrase order
    pub favorite_media: Vec<Vec<f32>>,
    pub wish: Vec<f32>,
    pub weekend_plan: Vec<f32>,
    pub expectation: Vec<f32>,
    pub narrative: Vec<f32>,
}

/// Applicant together with its text embeddings; the unit both scorers consume
#[derive(Debug, Clone)]
pub struct EncodedApplicant {
    pub applicant: Applicant,
    pub embeddings: TextEmbeddings,
}
