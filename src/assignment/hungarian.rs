//! Hungarian Algorithm for Optimal Assignment
//!
//! Kuhn-Munkres with row/column potentials, solving the rectangular linear
//! assignment problem in O(n² m) time without padding the matrix.

use alloc::vec;
use alloc::vec::Vec;

use crate::{PhdError, Result};

/// Result of an assignment problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Assignment mapping: row i is assigned to column mapping[i].
    /// None means the row is unassigned
    pub mapping: Vec<Option<usize>>,
    /// Total cost of the assignment
    pub cost: f64,
}

impl Assignment {
    /// Creates a new assignment with the given mapping and cost.
    pub fn new(mapping: Vec<Option<usize>>, cost: f64) -> Self {
        Self { mapping, cost }
    }

    /// Returns the number of assigned pairs.
    pub fn num_assigned(&self) -> usize {
        self.mapping.iter().filter(|x| x.is_some()).count()
    }

    /// Returns an iterator over (row, col) pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.mapping
            .iter()
            .enumerate()
            .filter_map(|(row, col)| col.map(|c| (row, c)))
    }
}

/// Dense row-major cost matrix.
#[derive(Debug, Clone)]
pub struct CostMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl CostMatrix {
    /// Creates a cost matrix from row-major data.
    ///
    /// Fails with [`PhdError::AssignmentFailed`] if the data length does not
    /// match the shape.
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(PhdError::AssignmentFailed);
        }
        Ok(Self { data, rows, cols })
    }

    /// Creates a cost matrix filled with a value.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: vec![value; rows * cols],
            rows,
            cols,
        }
    }

    /// Returns the number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Gets the cost at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Sets the cost at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    fn transposed(&self) -> Self {
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..self.cols {
            for i in 0..self.rows {
                data.push(self.get(i, j));
            }
        }
        Self {
            data,
            rows: self.cols,
            cols: self.rows,
        }
    }
}

/// Solves the linear assignment problem, minimising total cost.
///
/// Every row is assigned when `rows <= cols`, otherwise every column is.
/// Fails with [`PhdError::AssignmentFailed`] if any cost is not finite.
pub fn hungarian(cost: &CostMatrix) -> Result<Assignment> {
    if cost.data.iter().any(|c| !c.is_finite()) {
        return Err(PhdError::AssignmentFailed);
    }
    if cost.rows == 0 || cost.cols == 0 {
        return Ok(Assignment::new(vec![None; cost.rows], 0.0));
    }

    let mapping = if cost.rows <= cost.cols {
        solve_wide(cost)
    } else {
        // Solve column-to-row and invert the mapping
        let by_col = solve_wide(&cost.transposed());
        let mut mapping = vec![None; cost.rows];
        for (col, row) in by_col.iter().enumerate() {
            if let Some(row) = row {
                mapping[*row] = Some(col);
            }
        }
        mapping
    };

    let total = mapping
        .iter()
        .enumerate()
        .filter_map(|(i, j)| j.map(|j| cost.get(i, j)))
        .sum();

    Ok(Assignment::new(mapping, total))
}

/// Potentials-based solver for `rows <= cols`.
///
/// Index 0 of the potential and matching arrays is a virtual column.
fn solve_wide(cost: &CostMatrix) -> Vec<Option<usize>> {
    let n = cost.rows;
    let m = cost.cols;

    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; m + 1];
    // row matched to column j (1-based), 0 for none
    let mut matched = vec![0_usize; m + 1];
    let mut way = vec![0_usize; m + 1];

    for i in 1..=n {
        matched[0] = i;
        let mut j0 = 0;
        let mut min_to = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = matched[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost.get(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < min_to[j] {
                    min_to[j] = reduced;
                    way[j] = j0;
                }
                if min_to[j] < delta {
                    delta = min_to[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[matched[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_to[j] -= delta;
                }
            }

            j0 = j1;
            if matched[j0] == 0 {
                break;
            }
        }

        // Augment along the alternating path
        while j0 != 0 {
            let prev = way[j0];
            matched[j0] = matched[prev];
            j0 = prev;
        }
    }

    let mut mapping = vec![None; n];
    for j in 1..=m {
        if matched[j] != 0 {
            mapping[matched[j] - 1] = Some(j - 1);
        }
    }
    mapping
}
