//! Pairing Engine - batch matchmaking for a one-to-one pairing event
//!
//! Applicants are scored pairwise on stated preferences and on the semantic
//! similarity of their free-text answers, then paired globally: opposite-sex
//! pools with a Hungarian assignment, same-sex pools with a maximum-weight
//! blossom matching.

pub mod config;
pub mod core;
pub mod models;
pub mod services;
pub mod solver;

// Re-export commonly used types
pub use core::{RoundMatcher, PipelineError, Score, ScoreMatrix};
pub use models::{Applicant, ApplicantRow, RoundReport};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = RoundMatcher::default();
        assert_eq!(matcher.scorer().policy().preference_weight, 1.0);
        assert!(Score::Value(1.0).is_positive());
    }
}
