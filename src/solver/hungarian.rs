use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::matrix::ScoreMatrix;
use crate::core::scoring::Score;
use crate::solver::{SolverError, MAX_SCALED_WEIGHT, WEIGHT_SCALE};

/// One row of a bipartite assignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AssignedPair {
    pub row: usize,
    pub col: usize,
    /// Unmodified score of the cell; padding cells score zero
    pub score: Score,
    /// Row or column is a padding slot with no real applicant behind it
    pub padded: bool,
    /// The cell was disqualified and only chosen because nothing else fit
    pub forced: bool,
}

impl AssignedPair {
    /// A real, acceptable pairing the caller can confirm
    pub fn is_real(&self) -> bool {
        !self.padded && !self.forced
    }
}

/// Result of a square (padded) minimum-cost assignment
#[derive(Debug, Clone, Default, Serialize)]
pub struct BipartiteAssignment {
    /// One pair per row of the padded square matrix, padding rows included
    pub pairs: Vec<AssignedPair>,
    pub rows: usize,
    pub cols: usize,
}

impl BipartiteAssignment {
    pub fn real_pairs(&self) -> impl Iterator<Item = &AssignedPair> {
        self.pairs.iter().filter(|pair| pair.is_real())
    }

    pub fn forced_pairs(&self) -> impl Iterator<Item = &AssignedPair> {
        self.pairs.iter().filter(|pair| pair.forced)
    }

    /// Real rows left without an acceptable counterpart
    pub fn unmatched_rows(&self) -> Vec<usize> {
        self.pairs
            .iter()
            .filter(|pair| pair.row < self.rows && !pair.is_real())
            .map(|pair| pair.row)
            .collect()
    }

    /// Real columns left without an acceptable counterpart
    pub fn unmatched_cols(&self) -> Vec<usize> {
        self.pairs
            .iter()
            .filter(|pair| pair.col < self.cols && !pair.is_real())
            .map(|pair| pair.col)
            .collect()
    }

    pub fn total_score(&self) -> f64 {
        self.real_pairs().filter_map(|pair| pair.score.value()).sum()
    }
}

/// Maximum-score assignment between the rows and columns of `matrix`
///
/// The matrix is padded to square with zero scores, then inverted to
/// fixed-point costs with `cost = max - score` and handed to Kuhn-Munkres.
/// Disqualified cells get a cost larger than any assignment made only of
/// allowed cells, so the solver picks one only when no assignment avoids
/// it; such pairs come back with `forced` set.
pub fn assign_bipartite(matrix: &ScoreMatrix) -> Result<BipartiteAssignment, SolverError> {
    let (rows, cols) = matrix.shape();
    let size = rows.max(cols);
    if size == 0 {
        return Ok(BipartiteAssignment::default());
    }

    let mut values: Vec<Vec<Option<f64>>> = vec![vec![Some(0.0); size]; size];
    for (row, padded_row) in values.iter_mut().enumerate().take(rows) {
        for (col, cell) in padded_row.iter_mut().enumerate().take(cols) {
            *cell = match matrix.get(row, col) {
                Score::Value(value) if value.is_finite() => Some(value),
                Score::Value(_) => return Err(SolverError::NonFinite { row, col }),
                Score::Disqualified => None,
            };
        }
    }

    let costs = cost_matrix(&values)?;
    let (_, assignment) = kuhn_munkres_min(&costs);

    let pairs: Vec<AssignedPair> = assignment
        .into_iter()
        .enumerate()
        .map(|(row, col)| {
            let padded = row >= rows || col >= cols;
            let score = if padded {
                Score::Value(0.0)
            } else {
                matrix.get(row, col)
            };
            AssignedPair {
                row,
                col,
                score,
                padded,
                forced: score.is_disqualified(),
            }
        })
        .collect();

    let forced = pairs.iter().filter(|pair| pair.forced).count();
    if forced > 0 {
        warn!("{} assignments were forced onto disqualified pairs", forced);
    }
    debug!("Solved {}x{} assignment padded to {}", rows, cols, size);

    Ok(BipartiteAssignment { pairs, rows, cols })
}

/// `max - value` in fixed point for allowed cells; disqualified cells get
/// a forbidden cost larger than the total of any all-allowed assignment
fn cost_matrix(values: &[Vec<Option<f64>>]) -> Result<Matrix<i64>, SolverError> {
    let finite = values.iter().flatten().filter_map(|cell| *cell);
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (min, max) = if max.is_finite() { (min, max) } else { (0.0, 0.0) };

    let span = ((max - min) * WEIGHT_SCALE).round();
    if !span.is_finite() || span > MAX_SCALED_WEIGHT {
        return Err(SolverError::WeightOutOfRange(max - min));
    }

    // every potential the solver keeps stays within a few forbidden totals
    let size = values.len();
    let forbidden = (span as i64 + 1)
        .checked_mul(size as i64)
        .and_then(|cost| cost.checked_add(1))
        .filter(|cost| {
            cost.checked_mul(size as i64)
                .is_some_and(|total| total <= i64::MAX / 4)
        })
        .ok_or(SolverError::WeightOutOfRange(max - min))?;

    let mut costs = Matrix::new(size, size, 0i64);
    for (row, cells) in values.iter().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            costs[(row, col)] = match cell {
                Some(value) => ((max - value) * WEIGHT_SCALE).round() as i64,
                None => forbidden,
            };
        }
    }
    Ok(costs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn brute_force_best(values: &[Vec<f64>]) -> f64 {
        fn permute(values: &[Vec<f64>], row: usize, used: &mut Vec<bool>, acc: f64, best: &mut f64) {
            if row == values.len() {
                *best = best.max(acc);
                return;
            }
            for col in 0..values.len() {
                if !used[col] {
                    used[col] = true;
                    permute(values, row + 1, used, acc + values[row][col], best);
                    used[col] = false;
                }
            }
        }
        let mut best = f64::NEG_INFINITY;
        permute(values, 0, &mut vec![false; values.len()], 0.0, &mut best);
        best
    }

    fn matrix(rows: Vec<Vec<f64>>) -> ScoreMatrix {
        ScoreMatrix::from_values(
            rows.into_iter()
                .map(|row| row.into_iter().map(Some).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_square_assignment_is_a_permutation() {
        let scores = matrix(vec![
            vec![7.0, 3.0, 1.0, 9.0],
            vec![2.0, 8.0, 6.0, 4.0],
            vec![5.0, 5.0, 9.0, 1.0],
            vec![3.0, 7.0, 2.0, 6.0],
        ]);

        let result = assign_bipartite(&scores).unwrap();
        assert_eq!(result.pairs.len(), 4);

        let rows: HashSet<usize> = result.pairs.iter().map(|p| p.row).collect();
        let cols: HashSet<usize> = result.pairs.iter().map(|p| p.col).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(cols.len(), 4);
    }

    #[test]
    fn test_maximizes_total_score() {
        let values = vec![
            vec![7.0, 3.0, 1.0, 9.0],
            vec![2.0, 8.0, 6.0, 4.0],
            vec![5.0, 5.0, 9.0, 1.0],
            vec![3.0, 7.0, 2.0, 6.0],
        ];
        let result = assign_bipartite(&matrix(values.clone())).unwrap();
        assert!((result.total_score() - brute_force_best(&values)).abs() < 1e-9);
    }

    #[test]
    fn test_cost_inversion_preserves_optimum_with_negative_scores() {
        let values = vec![
            vec![-3.0, -10.0, 4.0],
            vec![12.0, -1.0, 0.5],
            vec![-7.5, 2.0, -2.0],
        ];
        let result = assign_bipartite(&matrix(values.clone())).unwrap();
        assert!((result.total_score() - brute_force_best(&values)).abs() < 1e-9);
        assert_eq!(
            result.pairs.iter().map(|p| (p.row, p.col)).collect::<Vec<_>>(),
            vec![(0, 2), (1, 0), (2, 1)]
        );
    }

    #[test]
    fn test_disqualified_cells_are_avoided() {
        let scores = ScoreMatrix::from_values(vec![
            vec![None, Some(1.0)],
            vec![Some(1.0), Some(100.0)],
        ])
        .unwrap();

        let result = assign_bipartite(&scores).unwrap();
        assert!(result.pairs.iter().all(|pair| !pair.forced));
        assert_eq!(
            result.pairs.iter().map(|p| (p.row, p.col)).collect::<Vec<_>>(),
            vec![(0, 1), (1, 0)]
        );
    }

    #[test]
    fn test_forced_disqualified_pair_is_flagged() {
        let scores = ScoreMatrix::from_values(vec![
            vec![None, None],
            vec![Some(5.0), Some(3.0)],
        ])
        .unwrap();

        let result = assign_bipartite(&scores).unwrap();
        assert_eq!(result.forced_pairs().count(), 1);
        assert_eq!(result.forced_pairs().next().unwrap().row, 0);
        assert_eq!(result.real_pairs().count(), 1);
        assert_eq!(result.unmatched_rows(), vec![0]);
    }

    #[test]
    fn test_padding_columns_for_extra_rows() {
        let scores = matrix(vec![vec![10.0, 1.0], vec![9.0, 2.0], vec![1.0, 8.0]]);

        let result = assign_bipartite(&scores).unwrap();
        assert_eq!(result.pairs.len(), 3);

        let padded: Vec<&AssignedPair> = result.pairs.iter().filter(|p| p.padded).collect();
        assert_eq!(padded.len(), 1);
        assert_eq!(padded[0].row, 1);
        assert_eq!(padded[0].col, 2);
        assert_eq!(result.unmatched_rows(), vec![1]);
        assert!((result.total_score() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_padding_rows_for_extra_columns() {
        let scores = matrix(vec![vec![1.0, 6.0, 3.0]]);

        let result = assign_bipartite(&scores).unwrap();
        assert_eq!(result.pairs.len(), 3);
        assert_eq!(result.real_pairs().map(|p| p.col).collect::<Vec<_>>(), vec![1]);

        let mut unmatched = result.unmatched_cols();
        unmatched.sort_unstable();
        assert_eq!(unmatched, vec![0, 2]);
    }

    #[test]
    fn test_negative_scores_lose_to_padding() {
        // the only real pair is worse than leaving row 0 unmatched
        let scores = matrix(vec![vec![-5.0], vec![-1.0]]);

        let result = assign_bipartite(&scores).unwrap();
        assert_eq!(result.real_pairs().map(|p| p.row).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_empty_matrix() {
        let result = assign_bipartite(&ScoreMatrix::new(0, 0, Score::Disqualified)).unwrap();
        assert!(result.pairs.is_empty());
    }

    #[test]
    fn test_nan_is_rejected() {
        let scores = matrix(vec![vec![f64::NAN]]);
        assert!(matches!(
            assign_bipartite(&scores),
            Err(SolverError::NonFinite { row: 0, col: 0 })
        ));
    }

    #[test]
    fn test_fewest_forced_pairs_then_best_score() {
        // deterministic 6x6 with fractional scores and scattered disqualified cells
        let values: Vec<Vec<Option<f64>>> = (0..6)
            .map(|i| {
                (0..6)
                    .map(|j| {
                        if (i * 5 + j * 3) % 4 == 0 {
                            None
                        } else {
                            Some(((i * 37 + j * 11) % 23) as f64 * 1.25 - 9.5)
                        }
                    })
                    .collect()
            })
            .collect();

        // (forced count, total allowed score) over every permutation
        fn search(
            values: &[Vec<Option<f64>>],
            row: usize,
            used: &mut Vec<bool>,
            forced: usize,
            acc: f64,
            best: &mut (usize, f64),
        ) {
            if row == values.len() {
                if forced < best.0 || (forced == best.0 && acc > best.1) {
                    *best = (forced, acc);
                }
                return;
            }
            for col in 0..values.len() {
                if !used[col] {
                    used[col] = true;
                    match values[row][col] {
                        Some(v) => search(values, row + 1, used, forced, acc + v, best),
                        None => search(values, row + 1, used, forced + 1, acc, best),
                    }
                    used[col] = false;
                }
            }
        }
        let mut best = (usize::MAX, f64::NEG_INFINITY);
        search(&values, 0, &mut vec![false; 6], 0, 0.0, &mut best);

        let result = assign_bipartite(&ScoreMatrix::from_values(values).unwrap()).unwrap();
        assert_eq!(result.forced_pairs().count(), best.0);
        assert!((result.total_score() - best.1).abs() < 1e-6);
    }

    #[test]
    fn test_score_span_too_wide_for_fixed_point() {
        let scores = matrix(vec![vec![1e12, -1e12]]);
        assert!(matches!(
            assign_bipartite(&scores),
            Err(SolverError::WeightOutOfRange(_))
        ));
    }
}
