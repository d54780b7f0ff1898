// Linear — Position-wise dense layer
//
// y = x · W + b, applied to every row of x independently.
//
// PARAMETER SHAPES:
//
//   weight: [in_features, out_features]
//   bias:   [1, out_features]  broadcast across rows
//
// COMPUTATION:
//
//   Input:  [seq, in_features]
//   Output: [seq, out_features]
//
// Used for the two halves of the transformer feed-forward sublayer and for the
// projection from d_model to vocabulary logits.

use rand::Rng;
use synapse_core::{Error, Matrix, Result};

use crate::init;
use crate::module::Module;

/// A dense layer applied position-wise: y = xW + b.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Matrix,
    bias: Matrix,
}

impl Linear {
    /// Weights U(-k, k) with k = sqrt(1/in_features); bias zero.
    pub fn new<R: Rng + ?Sized>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        Linear {
            weight: init::fan_in_uniform(in_features, out_features, rng),
            bias: Matrix::zeros(1, out_features),
        }
    }

    /// Build from existing parameters.
    pub fn from_weights(weight: Matrix, bias: Matrix) -> Result<Self> {
        if bias.rows() != 1 || bias.cols() != weight.cols() {
            return Err(Error::DimensionMismatch {
                op: "linear",
                lhs: weight.shape(),
                rhs: bias.shape(),
            });
        }
        Ok(Linear { weight, bias })
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    pub fn bias(&self) -> &Matrix {
        &self.bias
    }

    pub fn in_features(&self) -> usize {
        self.weight.rows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.cols()
    }
}

impl Module for Linear {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        x.dot(&self.weight)?.add_row_broadcast(&self.bias)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        vec![&self.weight, &self.bias]
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        vec![
            ("weight".to_string(), &self.weight),
            ("bias".to_string(), &self.bias),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_adds_bias_per_row() {
        let w = Matrix::from_2d(&[vec![1.0, 0.0, 1.0], vec![0.0, 1.0, 1.0]]).unwrap();
        let b = Matrix::row_vector(&[0.5, -0.5, 0.0]);
        let lin = Linear::from_weights(w, b).unwrap();
        let x = Matrix::from_2d(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let y = lin.forward(&x).unwrap();
        assert_eq!(y.to_2d(), vec![vec![1.5, 1.5, 3.0], vec![3.5, 3.5, 7.0]]);
        assert_eq!(lin.num_parameters(), 9);
    }

    #[test]
    fn test_bias_shape_checked() {
        let err = Linear::from_weights(Matrix::zeros(2, 3), Matrix::zeros(1, 2)).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { op: "linear", .. }));
    }
}
