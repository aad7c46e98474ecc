// Unit tests for the pairing engine

use pairing_engine::config::{DirectionMerge, ScoringConfig};
use pairing_engine::core::{
    distance::{circular_time_distance, cosine_similarity},
    preference::{disqualification, Disqualification, PreferenceScorer},
    scoring::{PairScorer, Score},
};
use pairing_engine::models::{
    Applicant, EncodedApplicant, Grade, Location, MbtiLetter, Sex, TextEmbeddings,
};
use uuid::Uuid;

fn create_test_applicant(handle: &str) -> Applicant {
    Applicant {
        id: Uuid::new_v4(),
        handle: handle.to_string(),
        sex: Sex::Female,
        preferred_sex: Sex::Male,
        grade: Grade::Ug3,
        school: "HKUST".to_string(),
        timezone: 8,
        location: Location::Hk,
        mbti_scores: [50; 4],
        preferred_mbti: [MbtiLetter::X; 4],
        acceptable_grades: vec![Grade::Ug2, Grade::Ug3, Grade::Ug4],
        acceptable_schools: vec!["HKUST".to_string(), "HKU".to_string()],
        max_time_difference: 3,
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

fn encoded(applicant: Applicant) -> EncodedApplicant {
    EncodedApplicant {
        applicant,
        embeddings: TextEmbeddings::default(),
    }
}

fn preference() -> PreferenceScorer {
    PreferenceScorer::new(ScoringConfig::default().preference)
}

#[test]
fn test_circular_time_distance_wraps() {
    assert_eq!(circular_time_distance(2, 22), 4);
    assert_eq!(circular_time_distance(22, 2), 4);
    assert_eq!(circular_time_distance(-5, 8), 11);
    assert_eq!(circular_time_distance(-11, 12), 1);
    assert_eq!(circular_time_distance(3, 3), 0);
}

#[test]
fn test_cosine_similarity_handles_zero_vectors() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), Some(0.0));
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), None);

    let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
    assert!((opposite + 1.0).abs() < 1e-6);
}

#[test]
fn test_named_partner_override_beats_every_hard_constraint() {
    let mut from = create_test_applicant("alice");
    from.preferred_partner = Some("bob".to_string());
    from.continue_match = false;
    from.acceptable_grades.clear();
    from.same_location_only = true;
    from.max_time_difference = 0;

    let mut to = create_test_applicant("bob");
    to.location = Location::Us;
    to.timezone = -5;

    assert_eq!(preference().score(&from, &to).unwrap(), Score::Value(999.0));
}

#[test]
fn test_continue_match_false_alone_disqualifies() {
    let mut from = create_test_applicant("alice");
    from.continue_match = false;
    let to = create_test_applicant("bob");

    assert_eq!(disqualification(&from, &to), Some(Disqualification::NotContinuing));
    assert_eq!(preference().score(&from, &to).unwrap(), Score::Disqualified);
}

#[test]
fn test_hard_constraints_are_checked_independently() {
    let from = create_test_applicant("alice");

    let mut wrong_school = create_test_applicant("bob");
    wrong_school.school = "CUHK".to_string();
    assert_eq!(
        disqualification(&from, &wrong_school),
        Some(Disqualification::SchoolNotAccepted)
    );

    let mut wrong_grade = create_test_applicant("carol");
    wrong_grade.grade = Grade::Phd;
    assert_eq!(
        disqualification(&from, &wrong_grade),
        Some(Disqualification::GradeNotAccepted)
    );

    let mut far_away = create_test_applicant("dan");
    far_away.timezone = -4;
    assert_eq!(
        disqualification(&from, &far_away),
        Some(Disqualification::TimeDifference)
    );

    let mut local_only = create_test_applicant("erin");
    local_only.same_location_only = true;
    let mut elsewhere = create_test_applicant("frank");
    elsewhere.location = Location::Sz;
    assert_eq!(
        disqualification(&local_only, &elsewhere),
        Some(Disqualification::DifferentLocation)
    );
}

#[test]
fn test_directional_asymmetry_is_allowed() {
    let mut from = create_test_applicant("alice");
    from.preferred_mbti = [MbtiLetter::E, MbtiLetter::X, MbtiLetter::X, MbtiLetter::X];
    let mut to = create_test_applicant("bob");
    to.mbti_scores = [10, 50, 50, 50];

    let forward = preference().score(&from, &to).unwrap();
    let reverse = preference().score(&to, &from).unwrap();
    assert_ne!(forward, reverse);
}

#[test]
fn test_pair_scorer_applies_composition_weights() {
    let from = encoded(create_test_applicant("alice"));
    let to = encoded(create_test_applicant("bob"));

    let mut config = ScoringConfig::default();
    let base = PairScorer::new(&config).directed(&from, &to).unwrap();

    config.composition.preference_weight = 2.0;
    config.composition.direction = DirectionMerge::Min;
    let doubled = PairScorer::new(&config).directed(&from, &to).unwrap();

    // empty answers contribute no similarity, so only preference scales
    assert_eq!(doubled.value().unwrap(), base.value().unwrap() * 2.0);
}

#[test]
fn test_professor_candidate_is_an_error_not_a_score() {
    let mut from = create_test_applicant("alice");
    from.acceptable_grades.push(Grade::Prof);
    let mut to = create_test_applicant("bob");
    to.grade = Grade::Prof;

    assert!(preference().score(&from, &to).is_err());
}
