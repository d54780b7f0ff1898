// Embedding — Lookup table for discrete tokens
//
// Maps integer token ids to dense d_model vectors:
//
//   embedding[token_id] → row of the [vocab_size x d_model] table
//
// forward() takes the token ids as a single column (a [seq x 1] matrix of
// integral values) and gathers the matching rows into a [seq x d_model]
// matrix. lookup() does the same from a slice of ids.

use rand::Rng;
use synapse_core::{Error, Matrix, Result};

use crate::init;
use crate::module::Module;

/// A [vocab_size x d_model] token embedding table.
#[derive(Debug, Clone)]
pub struct Embedding {
    weight: Matrix,
}

impl Embedding {
    /// Entries drawn from U(-k, k) with k = sqrt(1 / d_model).
    pub fn new<R: Rng + ?Sized>(vocab_size: usize, d_model: usize, rng: &mut R) -> Self {
        let scale = (1.0 / d_model.max(1) as f64).sqrt();
        Embedding {
            weight: init::uniform(vocab_size, d_model, scale, rng),
        }
    }

    pub fn from_weights(weight: Matrix) -> Self {
        Embedding { weight }
    }

    pub fn vocab_size(&self) -> usize {
        self.weight.rows()
    }

    pub fn d_model(&self) -> usize {
        self.weight.cols()
    }

    pub fn weight(&self) -> &Matrix {
        &self.weight
    }

    /// Rows for the given token ids. Ids outside the vocabulary are errors.
    pub fn lookup(&self, tokens: &[usize]) -> Result<Matrix> {
        if let Some(&bad) = tokens.iter().find(|&&t| t >= self.vocab_size()) {
            return Err(Error::msg(format!(
                "token id {bad} outside vocabulary of {}",
                self.vocab_size()
            )));
        }
        self.weight.gather_rows(tokens)
    }
}

/// Read a [seq x 1] column of non-negative integral values as token ids.
pub fn token_ids(x: &Matrix) -> Result<Vec<usize>> {
    if x.cols() != 1 {
        return Err(Error::msg(format!(
            "token ids must be a single column, got {}",
            x.shape()
        )));
    }
    x.data()
        .iter()
        .map(|&v| {
            if v >= 0.0 && v.fract() == 0.0 && v.is_finite() {
                Ok(v as usize)
            } else {
                Err(Error::msg(format!("{v} is not a valid token id")))
            }
        })
        .collect()
}

impl Module for Embedding {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        self.lookup(&token_ids(x)?)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        vec![&self.weight]
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        vec![("weight".to_string(), &self.weight)]
    }
}
