// Model exports
pub mod domain;
pub mod report;
pub mod snapshot;

pub use domain::{
    Applicant, EncodedApplicant, Grade, ListField, Location, MbtiAxis, MbtiLetter, PoolKind,
    ScalarField, Sex, TextEmbeddings, MBTI_AXES,
};
pub use report::{PairRecord, RoundReport, UnmatchedReason, UnmatchedRecord};
pub use snapshot::ApplicantRow;
