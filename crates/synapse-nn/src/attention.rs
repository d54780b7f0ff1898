// Multi-Head Attention — The core mechanism of the Transformer
//
// For every query position, attention computes a weighted average of the value
// rows, weighted by how well the query matches each key:
//
//   weights = softmax(Q · Kᵀ / √d_k)
//   out     = weights · V
//
// MULTIPLE HEADS:
//
// Q, K and V are first projected with [d_model x d_model] matrices. The
// projected d_model columns are then split into h column blocks of
// d_k = d_model / h, and each head attends using only its own block:
//
//   head_i = softmax(Q_i · K_iᵀ / √d_k) · V_i      Q_i = Q[:, i·d_k .. (i+1)·d_k]
//
// The head outputs are concatenated back to d_model columns and projected
// through W_O.
//
// MASKING:
//
// A mask is a [seq_q x seq_k] 0/1 matrix. Where it is 0 the score becomes
// -∞ before the softmax, so that edge gets exactly zero weight. The causal
// mask (create_causal_mask) allows position i to see positions j <= i only.

use rand::Rng;
use synapse_core::{Error, Matrix, Result};

use crate::activation::softmax_rows;
use crate::init;
use crate::module::Module;

/// The [n x n] lower-triangular causal mask: `[i][j] = 1` iff `j <= i`.
pub fn create_causal_mask(n: usize) -> Matrix {
    Matrix::zeros(n, n).map_indexed(|_, i, j| if j <= i { 1.0 } else { 0.0 })
}

/// Attention weights `softmax(q·kᵀ / √d_k)` with masked edges at zero.
pub fn attention_scores(q: &Matrix, k: &Matrix, mask: Option<&Matrix>, d_k: usize) -> Result<Matrix> {
    let scale = 1.0 / (d_k.max(1) as f64).sqrt();
    let scores = q.dot(&k.transpose())?.mul_scalar(scale);
    let scores = match mask {
        Some(mask) => {
            if mask.shape() != scores.shape() {
                return Err(Error::DimensionMismatch {
                    op: "attention_mask",
                    lhs: scores.shape(),
                    rhs: mask.shape(),
                });
            }
            let allowed = mask.data();
            let cols = scores.cols();
            scores.map_indexed(|s, i, j| {
                if allowed[i * cols + j] == 0.0 {
                    f64::NEG_INFINITY
                } else {
                    s
                }
            })
        }
        None => scores,
    };
    Ok(softmax_rows(&scores))
}

/// Single-head scaled dot-product attention: `softmax(q·kᵀ / √d_k) · v`.
pub fn scaled_dot_product_attention(
    q: &Matrix,
    k: &Matrix,
    v: &Matrix,
    mask: Option<&Matrix>,
    d_k: usize,
) -> Result<Matrix> {
    attention_scores(q, k, mask, d_k)?.dot(v)
}

/// Multi-head attention with learned Q/K/V/O projections.
#[derive(Debug, Clone)]
pub struct MultiHeadAttention {
    num_heads: usize,
    w_q: Matrix,
    w_k: Matrix,
    w_v: Matrix,
    w_o: Matrix,
}

impl MultiHeadAttention {
    /// Projections drawn from U(-k, k) with k = sqrt(1 / d_model).
    pub fn new<R: Rng + ?Sized>(d_model: usize, num_heads: usize, rng: &mut R) -> Result<Self> {
        check_heads(d_model, num_heads)?;
        let scale = (1.0 / d_model as f64).sqrt();
        Ok(MultiHeadAttention {
            num_heads,
            w_q: init::uniform(d_model, d_model, scale, rng),
            w_k: init::uniform(d_model, d_model, scale, rng),
            w_v: init::uniform(d_model, d_model, scale, rng),
            w_o: init::uniform(d_model, d_model, scale, rng),
        })
    }

    /// Build from existing [d_model x d_model] projections.
    pub fn from_weights(
        num_heads: usize,
        w_q: Matrix,
        w_k: Matrix,
        w_v: Matrix,
        w_o: Matrix,
    ) -> Result<Self> {
        let d_model = w_q.rows();
        check_heads(d_model, num_heads)?;
        for w in [&w_q, &w_k, &w_v, &w_o] {
            if w.rows() != d_model || w.cols() != d_model {
                return Err(Error::DimensionMismatch {
                    op: "multi_head_attention",
                    lhs: w_q.shape(),
                    rhs: w.shape(),
                });
            }
        }
        Ok(MultiHeadAttention {
            num_heads,
            w_q,
            w_k,
            w_v,
            w_o,
        })
    }

    pub fn num_heads(&self) -> usize {
        self.num_heads
    }

    pub fn d_model(&self) -> usize {
        self.w_q.rows()
    }

    /// Width of one head: d_model / num_heads.
    pub fn d_k(&self) -> usize {
        self.d_model() / self.num_heads
    }

    fn project(&self, q: &Matrix, k: &Matrix, v: &Matrix) -> Result<(Matrix, Matrix, Matrix)> {
        Ok((q.dot(&self.w_q)?, k.dot(&self.w_k)?, v.dot(&self.w_v)?))
    }

    /// Attention over separate query, key and value inputs (rows are
    /// positions, columns d_model). `mask` is [q.rows x k.rows].
    pub fn attend(&self, q: &Matrix, k: &Matrix, v: &Matrix, mask: Option<&Matrix>) -> Result<Matrix> {
        let (q, k, v) = self.project(q, k, v)?;
        let d_k = self.d_k();
        let mut heads = Vec::with_capacity(self.num_heads);
        for h in 0..self.num_heads {
            let start = h * d_k;
            let out = scaled_dot_product_attention(
                &q.narrow_cols(start, d_k)?,
                &k.narrow_cols(start, d_k)?,
                &v.narrow_cols(start, d_k)?,
                mask,
                d_k,
            )?;
            heads.push(out);
        }
        Matrix::concat_cols(&heads)?.dot(&self.w_o)
    }

    /// Per-head attention weight matrices, each [q.rows x k.rows].
    pub fn attention_weights(&self, q: &Matrix, k: &Matrix, mask: Option<&Matrix>) -> Result<Vec<Matrix>> {
        let q = q.dot(&self.w_q)?;
        let k = k.dot(&self.w_k)?;
        let d_k = self.d_k();
        (0..self.num_heads)
            .map(|h| {
                let start = h * d_k;
                attention_scores(&q.narrow_cols(start, d_k)?, &k.narrow_cols(start, d_k)?, mask, d_k)
            })
            .collect()
    }
}

fn check_heads(d_model: usize, num_heads: usize) -> Result<()> {
    if num_heads == 0 || d_model % num_heads != 0 {
        return Err(Error::config(format!(
            "d_model ({d_model}) must be divisible by num_heads ({num_heads})"
        )));
    }
    Ok(())
}

impl Module for MultiHeadAttention {
    /// Unmasked self-attention.
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        self.attend(x, x, x, None)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        vec![&self.w_q, &self.w_k, &self.w_v, &self.w_o]
    }

    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        vec![
            ("w_q".to_string(), &self.w_q),
            ("w_k".to_string(), &self.w_k),
            ("w_v".to_string(), &self.w_v),
            ("w_o".to_string(), &self.w_o),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_causal_mask() {
        let m = create_causal_mask(3);
        assert_eq!(
            m.to_2d(),
            vec![
                vec![1.0, 0.0, 0.0],
                vec![1.0, 1.0, 0.0],
                vec![1.0, 1.0, 1.0]
            ]
        );
    }

    #[test]
    fn test_masked_edges_get_zero_weight() {
        let mut rng = StdRng::seed_from_u64(0);
        let q = Matrix::random(4, 2, 1.0, &mut rng);
        let k = Matrix::random(4, 2, 1.0, &mut rng);
        let w = attention_scores(&q, &k, Some(&create_causal_mask(4)), 2).unwrap();
        for i in 0..4 {
            let mut row_sum = 0.0;
            for j in 0..4 {
                let v = w.get(i, j).unwrap();
                if j > i {
                    assert_eq!(v, 0.0);
                }
                row_sum += v;
            }
            assert!((row_sum - 1.0).abs() < 1e-12);
        }
        // First position can only see itself.
        assert_eq!(w.get(0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_identity_projections_single_head() {
        let eye = Matrix::identity(2);
        let mha = MultiHeadAttention::from_weights(1, eye.clone(), eye.clone(), eye.clone(), eye).unwrap();
        let x = Matrix::from_2d(&[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        let y = mha.attend(&x, &x, &x, Some(&create_causal_mask(2))).unwrap();
        // Row 0 attends only to itself.
        assert_eq!(y.row(0).unwrap().to_array(), vec![1.0, 0.0]);
        let expected = scaled_dot_product_attention(&x, &x, &x, Some(&create_causal_mask(2)), 2).unwrap();
        assert_eq!(y, expected);
    }

    #[test]
    fn test_heads_are_independent_blocks() {
        // With identity projections and two heads of width 1, each output
        // column is attention over that column alone.
        let eye = Matrix::identity(2);
        let mha = MultiHeadAttention::from_weights(2, eye.clone(), eye.clone(), eye.clone(), eye).unwrap();
        let x = Matrix::from_2d(&[vec![1.0, 5.0], vec![2.0, -1.0], vec![0.5, 0.0]]).unwrap();
        let y = mha.forward(&x).unwrap();
        for col in 0..2 {
            let c = x.narrow_cols(col, 1).unwrap();
            let expected = scaled_dot_product_attention(&c, &c, &c, None, 1).unwrap();
            assert_eq!(y.narrow_cols(col, 1).unwrap(), expected);
        }
        let weights = mha.attention_weights(&x, &x, None).unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].shape(), synapse_core::Shape::new(3, 3));
    }

    #[test]
    fn test_rejects_indivisible_heads() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            MultiHeadAttention::new(6, 4, &mut rng),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_mask_shape_checked() {
        let x = Matrix::ones(3, 2);
        assert!(attention_scores(&x, &x, Some(&create_causal_mask(2)), 2).is_err());
    }
}
