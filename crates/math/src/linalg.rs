//! Linear algebra operations for coefficient estimation.

use ndarray::{Array1, Array2};

use crate::MathError;

/// Pivots smaller than this fraction of the largest diagonal entry of the
/// system are treated as zero.
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-12;

/// Result of ordinary least squares regression.
#[derive(Debug, Clone)]
pub struct OlsResult {
    /// Estimated coefficients, one per design-matrix column.
    pub coefficients: Array1<f64>,
    /// Residuals.
    pub residuals: Array1<f64>,
    /// R-squared.
    pub r_squared: f64,
    /// Number of observations used.
    pub n_obs: usize,
}

/// Prepend a column of ones to a predictor matrix.
#[must_use]
pub fn with_intercept(x: &Array2<f64>) -> Array2<f64> {
    Array2::from_shape_fn((x.nrows(), x.ncols() + 1), |(i, j)| {
        if j == 0 { 1.0 } else { x[[i, j - 1]] }
    })
}

/// Perform ordinary least squares regression.
///
/// Solves the normal equations `(X'X) b = X'y`.
///
/// # Arguments
/// * `y` - Response vector (n,)
/// * `x` - Design matrix (n x p), including an intercept column if wanted
///
/// # Returns
/// OLS result with coefficients, residuals and R-squared.
///
/// # Errors
/// Returns `InsufficientObservations` when n < p, `Singular` when the
/// columns of `x` are collinear, and `NumericalInstability` on non-finite
/// input.
pub fn ordinary_least_squares(y: &Array1<f64>, x: &Array2<f64>) -> Result<OlsResult, MathError> {
    let n = y.len();
    let p = x.ncols();

    if x.nrows() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: x.nrows() });
    }
    if n == 0 || p == 0 {
        return Err(MathError::EmptyData);
    }
    if n < p {
        return Err(MathError::InsufficientObservations { required: p, actual: n });
    }
    if !y.iter().chain(x.iter()).all(|v| v.is_finite()) {
        return Err(MathError::NumericalInstability("non-finite value in input".to_string()));
    }

    let xtx = x.t().dot(x);
    let xty = x.t().dot(y);

    let coefficients = solve_linear_system(&xtx, &xty)?;

    let fitted = x.dot(&coefficients);
    let residuals = y - &fitted;

    let y_mean = y.mean().unwrap_or(0.0);
    let ss_tot: f64 = y.iter().map(|yi| (yi - y_mean).powi(2)).sum();
    let ss_res: f64 = residuals.iter().map(|r| r.powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Ok(OlsResult { coefficients, residuals, r_squared, n_obs: n })
}

/// Solve a linear system Ax = b using Gaussian elimination with partial pivoting.
///
/// # Errors
/// Returns `Singular` when a pivot falls below the relative tolerance.
pub fn solve_linear_system(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, MathError> {
    let n = a.nrows();
    if n == 0 {
        return Err(MathError::EmptyData);
    }
    if a.ncols() != n {
        return Err(MathError::LinearAlgebra("matrix must be square".to_string()));
    }
    if b.len() != n {
        return Err(MathError::DimensionMismatch { expected: n, actual: b.len() });
    }

    let scale = a.diag().iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = (scale * RELATIVE_PIVOT_TOLERANCE).max(f64::MIN_POSITIVE);

    // Augmented matrix [A | b]
    let mut aug = Array2::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[[col, col]].abs();
        for row in (col + 1)..n {
            if aug[[row, col]].abs() > max_val {
                max_val = aug[[row, col]].abs();
                max_row = row;
            }
        }

        if max_val < tolerance {
            return Err(MathError::Singular { column: col, pivot: max_val });
        }

        if max_row != col {
            for j in 0..=n {
                aug.swap([col, j], [max_row, j]);
            }
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / aug[[col, col]];
            for j in col..=n {
                aug[[row, j]] -= factor * aug[[col, j]];
            }
        }
    }

    // Back substitution
    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = aug[[i, n]];
        for j in (i + 1)..n {
            sum -= aug[[i, j]] * x[j];
        }
        x[i] = sum / aug[[i, i]];
    }

    Ok(x)
}
