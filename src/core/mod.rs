// Core algorithm exports
pub mod distance;
pub mod embedding;
pub mod grouping;
pub mod matcher;
pub mod matrix;
pub mod preference;
pub mod scoring;
pub mod similarity;

pub use distance::{circular_time_distance, cosine_similarity};
pub use embedding::encode_applicants;
pub use grouping::{separate_pools, Pools};
pub use matcher::{PipelineError, PoolOutcome, RoundMatcher};
pub use matrix::{bipartite_weights, build_matrix, same_pool_weights, MatrixError, ScoreMatrix};
pub use preference::{disqualification, Disqualification, PreferenceScorer};
pub use scoring::{merge_directions, PairScorer, Score, ScoreError};
pub use similarity::SimilarityScorer;
