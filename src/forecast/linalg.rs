//! Ordinary least squares for the small regressions used by the model fit
//! and the unit-root test.

use crate::error::{PipelineError, Result};

/// Relative pivot size below which a system counts as singular.
const PIVOT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub(crate) struct OlsFit {
    pub coefficients: Vec<f64>,
    pub residuals: Vec<f64>,
    pub ssr: f64,
    /// Diagonal of `(X'X)^-1`.
    pub inverse_diagonal: Vec<f64>,
}

impl OlsFit {
    /// Residual variance with the degrees-of-freedom correction.
    pub fn sigma2(&self) -> f64 {
        let dof = self.residuals.len().saturating_sub(self.coefficients.len());
        if dof == 0 {
            return f64::NAN;
        }
        self.ssr / dof as f64
    }

    pub fn standard_error(&self, index: usize) -> f64 {
        (self.sigma2() * self.inverse_diagonal[index]).sqrt()
    }
}

/// Solves `min ||y - X b||²` through the normal equations. Every row of
/// `design` must have the same length.
pub(crate) fn ols(design: &[Vec<f64>], target: &[f64], context: &str) -> Result<OlsFit> {
    if design.is_empty() {
        return Err(PipelineError::InsufficientData {
            what: context.to_string(),
            needed: 1,
            actual: 0,
        });
    }
    let width = design[0].len();
    if design.len() != target.len() || design.iter().any(|row| row.len() != width) {
        return Err(PipelineError::SingularSystem(format!(
            "{context}: ragged design matrix"
        )));
    }
    if design.len() < width {
        return Err(PipelineError::InsufficientData {
            what: context.to_string(),
            needed: width,
            actual: design.len(),
        });
    }

    let mut gram = vec![vec![0.0; width]; width];
    let mut moment = vec![0.0; width];
    for (row, &y) in design.iter().zip(target) {
        for i in 0..width {
            moment[i] += row[i] * y;
            for j in 0..width {
                gram[i][j] += row[i] * row[j];
            }
        }
    }

    let inverse = invert(gram, context)?;
    let coefficients: Vec<f64> = inverse
        .iter()
        .map(|inverse_row| inverse_row.iter().zip(&moment).map(|(a, b)| a * b).sum())
        .collect();

    let residuals: Vec<f64> = design
        .iter()
        .zip(target)
        .map(|(row, &y)| y - dot(row, &coefficients))
        .collect();
    let ssr = residuals.iter().map(|r| r * r).sum();
    let inverse_diagonal = (0..width).map(|i| inverse[i][i]).collect();

    Ok(OlsFit {
        coefficients,
        residuals,
        ssr,
        inverse_diagonal,
    })
}

pub(crate) fn dot(lhs: &[f64], rhs: &[f64]) -> f64 {
    lhs.iter().zip(rhs).map(|(a, b)| a * b).sum()
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut matrix: Vec<Vec<f64>>, context: &str) -> Result<Vec<Vec<f64>>> {
    let size = matrix.len();
    let scale = matrix
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, value| acc.max(value.abs()))
        .max(1.0);

    let mut inverse: Vec<Vec<f64>> = (0..size)
        .map(|i| (0..size).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for column in 0..size {
        let pivot_row = (column..size)
            .max_by(|&a, &b| matrix[a][column].abs().total_cmp(&matrix[b][column].abs()))
            .unwrap_or(column);
        if matrix[pivot_row][column].abs() <= PIVOT_TOLERANCE * scale {
            return Err(PipelineError::SingularSystem(context.to_string()));
        }
        matrix.swap(column, pivot_row);
        inverse.swap(column, pivot_row);

        let pivot = matrix[column][column];
        for j in 0..size {
            matrix[column][j] /= pivot;
            inverse[column][j] /= pivot;
        }

        for row in 0..size {
            if row == column {
                continue;
            }
            let factor = matrix[row][column];
            if factor == 0.0 {
                continue;
            }
            for j in 0..size {
                matrix[row][j] -= factor * matrix[column][j];
                inverse[row][j] -= factor * inverse[column][j];
            }
        }
    }

    Ok(inverse)
}
