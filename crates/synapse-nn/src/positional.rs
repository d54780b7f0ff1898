// PositionalEncoding — Fixed sinusoidal position signal
//
// Attention is permutation-invariant, so position has to be injected into the
// input. The table is precomputed once for positions 0..max_len:
//
//   PE[pos][i] = sin(pos / 10000^(2⌊i/2⌋ / d_model))   i even
//   PE[pos][i] = cos(pos / 10000^(2⌊i/2⌋ / d_model))   i odd
//
// forward(x) adds the first seq_len rows of the table to x. There are no
// parameters.

use synapse_core::{Error, Matrix, Result};

use crate::module::Module;

/// Precomputed [max_len x d_model] sinusoidal table.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    table: Matrix,
}

impl PositionalEncoding {
    pub fn new(max_len: usize, d_model: usize) -> Self {
        let table = Matrix::zeros(max_len, d_model).map_indexed(|_, pos, i| {
            let exponent = (2 * (i / 2)) as f64 / d_model as f64;
            let angle = pos as f64 / 10000f64.powf(exponent);
            if i % 2 == 0 {
                angle.sin()
            } else {
                angle.cos()
            }
        });
        PositionalEncoding { table }
    }

    pub fn max_len(&self) -> usize {
        self.table.rows()
    }

    pub fn d_model(&self) -> usize {
        self.table.cols()
    }

    /// The full encoding table.
    pub fn table(&self) -> &Matrix {
        &self.table
    }
}

impl Module for PositionalEncoding {
    fn forward(&self, x: &Matrix) -> Result<Matrix> {
        if x.rows() > self.max_len() {
            return Err(Error::SequenceTooLong {
                len: x.rows(),
                max: self.max_len(),
            });
        }
        if x.cols() != self.d_model() {
            return Err(Error::DimensionMismatch {
                op: "positional_encoding",
                lhs: x.shape(),
                rhs: self.table.shape(),
            });
        }
        x.add(&self.table.narrow_rows(0, x.rows())?)
    }

    fn parameters(&self) -> Vec<&Matrix> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_values() {
        let pe = PositionalEncoding::new(10, 4);
        let t = pe.table();
        // pos 0: sin(0)=0, cos(0)=1
        assert_eq!(t.row(0).unwrap().to_array(), vec![0.0, 1.0, 0.0, 1.0]);
        // pos 1, i=2: angle = 1 / 10000^(2/4) = 0.01
        assert!((t.get(1, 2).unwrap() - 0.01f64.sin()).abs() < 1e-12);
        assert!((t.get(1, 3).unwrap() - 0.01f64.cos()).abs() < 1e-12);
        assert!((t.get(3, 0).unwrap() - 3f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_forward_adds_prefix_rows() {
        let pe = PositionalEncoding::new(10, 4);
        let x = Matrix::zeros(3, 4);
        let y = pe.forward(&x).unwrap();
        assert_eq!(y, pe.table().narrow_rows(0, 3).unwrap());
        assert_eq!(pe.num_parameters(), 0);
    }

    #[test]
    fn test_errors() {
        let pe = PositionalEncoding::new(2, 4);
        assert!(matches!(
            pe.forward(&Matrix::zeros(3, 4)),
            Err(Error::SequenceTooLong { len: 3, max: 2 })
        ));
        assert!(matches!(
            pe.forward(&Matrix::zeros(2, 5)),
            Err(Error::DimensionMismatch { .. })
        ));
    }
}
