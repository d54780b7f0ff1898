// LayerNorm — Layer Normalization
//
// Normalizes each row (one sequence position) across its features,
// independently of every other row.
//
// FORMULA:
//   y = (x - mean(x)) / sqrt(var(x) + ε) * γ + β
//
// Where:
//   - mean and (biased) variance are taken over the row
//   - γ (gamma) starts at ones and β (beta) at zeros, both [1 x size]
//   - ε is a small constant under the square root (default 1e-5)
//
// The transformer blocks use it post-norm: LayerNorm(x + sublayer(x)).

use synapse_core::{Error, Matrix, Result};

use crate::module::Module;

/// Per-row layer normalization with learnable scale and shift.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    gamma: Matrix,
    beta: Matrix,
    eps: f64,
}

impl LayerNorm {
    /// γ = 1, β = 0.
    pub fn new(size: usize, eps: f64) -> Self {
        LayerNorm {
            gamma: Matrix::ones(1, size),
            beta: Matrix::zeros(1, size),
            eps,
        }
    }

    /// Build from existing γ and β, both [1 x size].
    pub fn from_weights(gamma: Matrix, beta: Matrix, eps: f64) -> Result<Self> {
        if gamma.rows() != 1 || gamma.shape() != beta.shape() {
            return Err(Error::DimensionMismatch {
                op: "layer_norm",
                lhs: gamma.shape(),
                rhs: beta.shape(),
            });
        }
        Ok(LayerNorm { gamma, beta, eps })
    }

    pub fn size(&self) -> usize {
        self.gamma.cols()
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn gamma(&self) -> &Matrix {
        &self.gamma
    }

    pub fn beta(&self) -> &Matrix {
        &self.beta
    }
}

impl Module for LayerNorm {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        if x.cols() != self.size() {
            return Err(Error::DimensionMismatch {
                op: "layer_norm",
                lhs: x.shape(),
                rhs: self.gamma.shape(),
            });
        }
        let gamma = self.gamma.data();
        let beta = self.beta.data();
        let eps = self.eps;
        Ok(x.map_rows(|row, out| {
            let n = row.len() as f64;
            let mean = row.iter().sum::<f64>() / n;
            let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
            let inv_std = 1.0 / (var + eps).sqrt();
            for (j, o) in out.iter_mut().enumerate() {
                *o = (row[j] - mean) * inv_std * gamma[j] + beta[j];
            }
        }))
    }

    fn parameters(&self) -> Vec<&Matrix> {
        vec![&self.gamma, &self.beta]
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        vec![
            ("gamma".to_string(), &self.gamma),
            ("beta".to_string(), &self.beta),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_normalized() {
        let ln = LayerNorm::new(4, 1e-5);
        let x = Matrix::from_2d(&[vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 10.0, 10.0, 14.0]]).unwrap();
        let y = ln.forward(&x).unwrap();
        for r in 0..2 {
            let row = y.row(r).unwrap();
            let mean = row.sum() / 4.0;
            let var = row.map(|v| (v - mean) * (v - mean)).sum() / 4.0;
            assert!(mean.abs() < 1e-9);
            assert!((var - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_constant_row_is_zero() {
        let ln = LayerNorm::new(3, 1e-5);
        let y = ln.forward(&Matrix::full(1, 3, 7.0)).unwrap();
        assert_eq!(y.to_array(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gamma_beta_applied() {
        let ln = LayerNorm::from_weights(
            Matrix::row_vector(&[2.0, 2.0]),
            Matrix::row_vector(&[1.0, -1.0]),
            0.0,
        )
        .unwrap();
        let y = ln.forward(&Matrix::row_vector(&[0.0, 2.0])).unwrap();
        assert_eq!(y.to_array(), vec![-1.0, 1.0]);
    }
}
