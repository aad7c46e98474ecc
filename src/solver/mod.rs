// Assignment solver exports
pub mod blossom;
pub mod hungarian;

use thiserror::Error;

pub use blossom::{match_same_pool, max_weight_matching, MatchedPair, WeightedEdge};
pub use hungarian::{assign_bipartite, AssignedPair, BipartiteAssignment};

/// Both solvers work on fixed-point integer weights so their arithmetic
/// stays exact
pub(crate) const WEIGHT_SCALE: f64 = 1_000_000.0;
pub(crate) const MAX_SCALED_WEIGHT: f64 = 4_503_599_627_370_496.0; // 2^52

/// Errors that can occur while solving an assignment
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Score at ({row}, {col}) is not a finite number")]
    NonFinite { row: usize, col: usize },

    #[error("Edge ({u}, {v}) is invalid for a graph of {vertices} vertices")]
    InvalidEdge { u: usize, v: usize, vertices: usize },

    #[error("Weight {0} is outside the supported range")]
    WeightOutOfRange(f64),

    #[error("Same-pool matching needs a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}
