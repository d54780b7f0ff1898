// FeedForward — Position-wise feed-forward sublayer of a transformer block
//
//   FFN(x) = GELU(x · W1 + b1) · W2 + b2
//
//   W1: [d_model x d_ff]   b1: [1 x d_ff]
//   W2: [d_ff x d_model]   b2: [1 x d_model]
//
// Every row (sequence position) goes through the same two layers
// independently; the biases broadcast across rows.

use rand::Rng;
use synapse_core::{Matrix, Result};

use crate::activation::gelu;
use crate::linear::Linear;
use crate::module::{prefixed, Module};

/// Two dense layers with a GELU in between.
#[derive(Debug, Clone)]
pub struct FeedForward {
    expand: Linear,
    contract: Linear,
}

impl FeedForward {
    /// Weights U(-k, k) with k = sqrt(1/fan_in); biases zero.
    pub fn new<R: Rng + ?Sized>(d_model: usize, d_ff: usize, rng: &mut R) -> Self {
        FeedForward {
            expand: Linear::new(d_model, d_ff, rng),
            contract: Linear::new(d_ff, d_model, rng),
        }
    }

    pub fn from_weights(w1: Matrix, b1: Matrix, w2: Matrix, b2: Matrix) -> Result<Self> {
        Ok(FeedForward {
            expand: Linear::from_weights(w1, b1)?,
            contract: Linear::from_weights(w2, b2)?,
        })
    }

    pub fn d_model(&self) -> usize {
        self.expand.in_features()
    }

    pub fn d_ff(&self) -> usize {
        self.expand.out_features()
    }
}

impl Module for FeedForward {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        let hidden = self.expand.forward(x)?.map(gelu);
        self.contract.forward(&hidden)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        let mut p = self.expand.parameters();
        p.extend(self.contract.parameters());
        p
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        let mut p = prefixed("expand", self.expand.named_parameters());
        p.extend(prefixed("contract", self.contract.named_parameters()));
        p
    }
}
