//! Linear solves of the free-free stiffness block.
//!
//! Restarted GMRES is tried first. When the model contains substitute bars, whose
//! rigidity ruins the conditioning, or when GMRES does not converge, the system is
//! solved with a dense Cholesky factorization of the reverse Cuthill-McKee permuted
//! matrix. The factorization is kept so further right-hand sides reuse it.

use std::collections::VecDeque;

use log::{debug, warn};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};
use nalgebra_sparse::CsrMatrix;
use thiserror::Error;

use crate::config::SolverSettings;

/// Failure of a linear solve.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SolveError {
    /// The matrix could not be Cholesky factored.
    #[error("stiffness matrix is not positive definite")]
    NotPositiveDefinite,
    /// A vector does not match the matrix dimensions.
    #[error("expected a vector of length {expected}, received {found}")]
    DimensionMismatch {
        /// Number of rows of the matrix.
        expected: usize,
        /// Length of the supplied vector.
        found: usize,
    },
}

/// Sparse matrix-vector product for any CSR shape.
#[must_use]
pub fn multiply(matrix: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(matrix.nrows());
    let offsets = matrix.row_offsets();
    let columns = matrix.col_indices();
    let values = matrix.values();
    for row in 0..matrix.nrows() {
        y[row] = (offsets[row]..offsets[row + 1])
            .map(|entry| values[entry] * x[columns[entry]])
            .sum();
    }
    y
}

/// Reverse Cuthill-McKee ordering of a symmetric sparse matrix.
///
/// `permutation[new] = old`.
#[must_use]
pub fn reverse_cuthill_mckee(matrix: &CsrMatrix<f64>) -> Vec<usize> {
    let n = matrix.nrows();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (row, col, _) in matrix.triplet_iter() {
        if row != col {
            adjacency[row].push(col);
        }
    }
    let degrees: Vec<usize> = adjacency.iter().map(Vec::len).collect();
    for neighbours in &mut adjacency {
        neighbours.sort_by_key(|&node| degrees[node]);
        neighbours.dedup();
    }

    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();
    while order.len() < n {
        // Each component starts from its lowest-degree unvisited node.
        let Some(start) = (0..n).filter(|&i| !visited[i]).min_by_key(|&i| degrees[i]) else {
            break;
        };
        visited[start] = true;
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &neighbour in &adjacency[node] {
                if !visited[neighbour] {
                    visited[neighbour] = true;
                    queue.push_back(neighbour);
                }
            }
        }
    }
    order.reverse();
    order
}

/// Dense Cholesky factorization of a symmetrically permuted matrix.
#[derive(Clone, Debug)]
pub struct PermutedCholesky {
    /// New position of each original row.
    permutation: Vec<usize>,
    /// Factor of the permuted matrix.
    factor: Cholesky<f64, Dyn>,
}

impl PermutedCholesky {
    /// Permute with reverse Cuthill-McKee and factor.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::NotPositiveDefinite`] when the factorization fails.
    pub fn factor(matrix: &CsrMatrix<f64>) -> Result<Self, SolveError> {
        let permutation = reverse_cuthill_mckee(matrix);
        let mut inverse = vec![0; permutation.len()];
        for (new, &old) in permutation.iter().enumerate() {
            inverse[old] = new;
        }
        let n = matrix.nrows();
        let mut dense = DMatrix::zeros(n, n);
        for (row, col, &value) in matrix.triplet_iter() {
            dense[(inverse[row], inverse[col])] += value;
        }
        let factor = Cholesky::new(dense).ok_or(SolveError::NotPositiveDefinite)?;
        Ok(Self {
            permutation,
            factor,
        })
    }

    /// Smallest diagonal entry of the lower triangular factor.
    #[must_use]
    pub fn min_pivot(&self) -> f64 {
        self.factor
            .l_dirty()
            .diagonal()
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }

    /// Solve `A x = b`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::DimensionMismatch`] when `b` has the wrong length.
    pub fn solve(&self, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
        let n = self.permutation.len();
        if b.len() != n {
            return Err(SolveError::DimensionMismatch {
                expected: n,
                found: b.len(),
            });
        }
        let permuted = DVector::from_iterator(n, self.permutation.iter().map(|&old| b[old]));
        let y = self.factor.solve(&permuted);
        let mut x = DVector::zeros(n);
        for (new, &old) in self.permutation.iter().enumerate() {
            x[old] = y[new];
        }
        Ok(x)
    }
}

/// Restarted GMRES with Givens rotations.
///
/// Returns the solution and the number of iterations, or `None` when the relative
/// residual does not drop below the tolerance within the iteration cap.
#[must_use]
pub fn gmres(
    matrix: &CsrMatrix<f64>,
    b: &DVector<f64>,
    settings: &SolverSettings,
) -> Option<(DVector<f64>, usize)> {
    let n = b.len();
    let mut x = DVector::zeros(n);
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Some((x, 0));
    }
    let tolerance = settings.tolerance * b_norm;
    let restart = settings.restart.clamp(1, n.max(1));
    let mut iterations = 0;

    loop {
        let residual = b - multiply(matrix, &x);
        let beta = residual.norm();
        if beta <= tolerance {
            return Some((x, iterations));
        }
        if iterations >= settings.max_iterations {
            return None;
        }

        let mut basis = vec![residual / beta];
        let mut hessenberg = DMatrix::zeros(restart + 1, restart);
        let mut cosines = vec![0.0; restart];
        let mut sines = vec![0.0; restart];
        let mut g = DVector::zeros(restart + 1);
        g[0] = beta;

        let mut k = 0;
        while k < restart && iterations < settings.max_iterations {
            let mut w = multiply(matrix, &basis[k]);
            for (i, v) in basis.iter().enumerate() {
                let h = w.dot(v);
                hessenberg[(i, k)] = h;
                w.axpy(-h, v, 1.0);
            }
            let next_norm = w.norm();
            hessenberg[(k + 1, k)] = next_norm;

            for i in 0..k {
                let upper = hessenberg[(i, k)];
                let lower = hessenberg[(i + 1, k)];
                hessenberg[(i, k)] = cosines[i] * upper + sines[i] * lower;
                hessenberg[(i + 1, k)] = -sines[i] * upper + cosines[i] * lower;
            }
            let (c, s) = givens(hessenberg[(k, k)], hessenberg[(k + 1, k)]);
            cosines[k] = c;
            sines[k] = s;
            hessenberg[(k, k)] = c * hessenberg[(k, k)] + s * hessenberg[(k + 1, k)];
            hessenberg[(k + 1, k)] = 0.0;
            g[k + 1] = -s * g[k];
            g[k] *= c;

            iterations += 1;
            k += 1;
            if g[k].abs() <= tolerance || next_norm <= f64::EPSILON * beta {
                break;
            }
            basis.push(w / next_norm);
        }

        let y = back_substitute(&hessenberg, &g, k)?;
        for (i, v) in basis.iter().take(k).enumerate() {
            x.axpy(y[i], v, 1.0);
        }
    }
}

/// Cosine and sine of the rotation that zeroes `b` against `a`.
fn givens(a: f64, b: f64) -> (f64, f64) {
    let r = a.hypot(b);
    if r == 0.0 {
        (1.0, 0.0)
    } else {
        (a / r, b / r)
    }
}

/// Solve the leading `k × k` upper-triangular system. `None` on a zero diagonal.
fn back_substitute(upper: &DMatrix<f64>, g: &DVector<f64>, k: usize) -> Option<DVector<f64>> {
    let mut y = DVector::zeros(k);
    for i in (0..k).rev() {
        let diagonal = upper[(i, i)];
        if diagonal == 0.0 {
            return None;
        }
        let tail: f64 = (i + 1..k).map(|j| upper[(i, j)] * y[j]).sum();
        y[i] = (g[i] - tail) / diagonal;
    }
    Some(y)
}

/// Solver for repeated right-hand sides against one K11 block.
#[derive(Debug)]
pub struct LinearSolver<'a> {
    /// The K11 block.
    matrix: &'a CsrMatrix<f64>,
    /// GMRES settings.
    settings: &'a SolverSettings,
    /// Skip GMRES entirely.
    dense_only: bool,
    /// Dense factor, built on first fallback and reused.
    dense: Option<PermutedCholesky>,
}

impl<'a> LinearSolver<'a> {
    /// Create a solver. `dense_only` skips GMRES, as needed when substitute bars
    /// are present.
    #[must_use]
    pub fn new(matrix: &'a CsrMatrix<f64>, settings: &'a SolverSettings, dense_only: bool) -> Self {
        Self {
            matrix,
            settings,
            dense_only,
            dense: None,
        }
    }

    /// Solve `K11 x = b`.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError`] when the dense fallback fails too.
    pub fn solve(&mut self, b: &DVector<f64>) -> Result<DVector<f64>, SolveError> {
        if b.len() != self.matrix.nrows() {
            return Err(SolveError::DimensionMismatch {
                expected: self.matrix.nrows(),
                found: b.len(),
            });
        }
        if b.is_empty() {
            return Ok(DVector::zeros(0));
        }
        if !self.dense_only {
            if let Some((x, iterations)) = gmres(self.matrix, b, self.settings) {
                debug!("GMRES converged in {iterations} iterations");
                return Ok(x);
            }
            warn!("GMRES did not converge, falling back to dense Cholesky");
        }
        if self.dense.is_none() {
            self.dense = Some(PermutedCholesky::factor(self.matrix)?);
        }
        match &self.dense {
            Some(dense) => dense.solve(b),
            None => Err(SolveError::NotPositiveDefinite),
        }
    }
}
