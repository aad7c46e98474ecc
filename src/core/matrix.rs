use rayon::prelude::*;
use std::num::NonZeroUsize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::DirectionMerge;
use crate::core::scoring::{merge_directions, PairScorer, Score, ScoreError};
use crate::models::EncodedApplicant;

/// Errors raised while building or reshaping a score matrix
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Scoring cell ({row}, {col}) failed: {source}")]
    Cell {
        row: usize,
        col: usize,
        #[source]
        source: ScoreError,
    },

    #[error("Failed to start scoring workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Matrix shape mismatch: expected {expected:?}, got {actual:?}")]
    Shape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("Matrix rows have different lengths")]
    Ragged,
}

/// Dense row-major matrix of scores between two pools
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Score>,
}

impl ScoreMatrix {
    pub fn new(rows: usize, cols: usize, fill: Score) -> Self {
        Self {
            rows,
            cols,
            cells: vec![fill; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<Score>>) -> Result<Self, MatrixError> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != cols) {
            return Err(MatrixError::Ragged);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    /// Convenience constructor where `None` marks a disqualified cell
    pub fn from_values(rows: Vec<Vec<Option<f64>>>) -> Result<Self, MatrixError> {
        Self::from_rows(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|cell| cell.map_or(Score::Disqualified, Score::Value))
                        .collect()
                })
                .collect(),
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Score {
        self.cells[row * self.cols + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, score: Score) {
        self.cells[row * self.cols + col] = score;
    }

    pub fn row(&self, row: usize) -> &[Score] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    pub fn disqualified_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_disqualified()).count()
    }

    /// Combine this `from -> to` matrix with the `to -> from` matrix
    ///
    /// `reverse` must be the transpose-shaped matrix scored in the other
    /// direction; cell (i, j) becomes `merge(self[i][j], reverse[j][i])`.
    pub fn merge_directions(
        &self,
        reverse: &ScoreMatrix,
        merge: DirectionMerge,
    ) -> Result<ScoreMatrix, MatrixError> {
        if reverse.shape() != (self.cols, self.rows) {
            return Err(MatrixError::Shape {
                expected: (self.cols, self.rows),
                actual: reverse.shape(),
            });
        }

        let mut merged = ScoreMatrix::new(self.rows, self.cols, Score::Disqualified);
        for i in 0..self.rows {
            for j in 0..self.cols {
                merged.set(i, j, merge_directions(self.get(i, j), reverse.get(j, i), merge));
            }
        }
        Ok(merged)
    }
}

/// Worker count bounded by hardware parallelism and by the number of cells
pub fn worker_count(requested: Option<usize>, cells: usize) -> usize {
    let available = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    requested
        .unwrap_or(available)
        .min(available)
        .min(cells)
        .max(1)
}

/// Score every ordered pair (from[i], to[j]) in parallel
///
/// Cells are independent. They are split into one contiguous range per
/// worker, and each range is scored with its own clone of the scorer. The
/// calling thread alone writes results into the matrix by explicit (i, j).
/// The first failing cell aborts the whole build.
pub fn build_matrix(
    from: &[EncodedApplicant],
    to: &[EncodedApplicant],
    scorer: &PairScorer,
    workers: Option<usize>,
) -> Result<ScoreMatrix, MatrixError> {
    let (n, m) = (from.len(), to.len());
    let mut matrix = ScoreMatrix::new(n, m, Score::Disqualified);
    let cells = n * m;
    if cells == 0 {
        return Ok(matrix);
    }

    let workers = worker_count(workers, cells);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("score-worker-{}", index))
        .build()?;

    info!("Scoring {}x{} matrix on {} workers", n, m, workers);

    let chunk = cells.div_ceil(workers);
    let scored: Vec<Vec<(usize, usize, Score)>> = pool.install(|| {
        (0..workers)
            .into_par_iter()
            .map(|worker| {
                let scorer = scorer.clone();
                let start = worker * chunk;
                let end = (start + chunk).min(cells);
                (start..end)
                    .map(|cell| {
                        let (row, col) = (cell / m, cell % m);
                        scorer
                            .directed(&from[row], &to[col])
                            .map(|score| (row, col, score))
                            .map_err(|source| MatrixError::Cell { row, col, source })
                    })
                    .collect::<Result<Vec<_>, MatrixError>>()
            })
            .collect::<Result<Vec<_>, MatrixError>>()
    })?;

    for (row, col, score) in scored.into_iter().flatten() {
        matrix.set(row, col, score);
    }

    debug!(
        "Matrix {}x{} built with {} disqualified cells",
        n,
        m,
        matrix.disqualified_count()
    );
    Ok(matrix)
}

/// Pair weights between two opposite-sex pools, rows from `left`
pub fn bipartite_weights(
    left: &[EncodedApplicant],
    right: &[EncodedApplicant],
    scorer: &PairScorer,
    workers: Option<usize>,
) -> Result<ScoreMatrix, MatrixError> {
    let forward = build_matrix(left, right, scorer, workers)?;
    let merge = scorer.policy().direction;
    if merge == DirectionMerge::Forward {
        return Ok(forward);
    }

    let reverse = build_matrix(right, left, scorer, workers)?;
    forward.merge_directions(&reverse, merge)
}

/// Symmetrized pair weights within one same-sex pool
///
/// The diagonal is disqualified; nobody is paired with themselves.
pub fn same_pool_weights(
    pool: &[EncodedApplicant],
    scorer: &PairScorer,
    workers: Option<usize>,
) -> Result<ScoreMatrix, MatrixError> {
    let directed = build_matrix(pool, pool, scorer, workers)?;
    let merge = match scorer.policy().direction {
        // a one-sided weight is not symmetric; fall back to the sum
        DirectionMerge::Forward => DirectionMerge::Sum,
        other => other,
    };

    let mut weights = directed.merge_directions(&directed, merge)?;
    for i in 0..weights.rows() {
        weights.set(i, i, Score::Disqualified);
    }
    Ok(weights)
}
