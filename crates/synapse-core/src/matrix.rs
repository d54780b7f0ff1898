use std::fmt;

use rand::Rng;

use crate::accel::{self, Accelerator, ElementwiseOp, Operand};
use crate::error::{Error, Result};
use crate::shape::Shape;

// Matrix — The fundamental data structure
//
// A Matrix is a dense 2-D array of f64 values stored row-major in a flat
// buffer. Every model in synapse (the feed-forward network and the whole
// transformer stack) is expressed in terms of matrices: a column vector is an
// [n x 1] matrix, a sequence of embeddings is a [seq x d_model] matrix.
//
// INVARIANT:
//
//   data.len() == rows * cols, always.
//
// VALUE SEMANTICS:
//
//   Every operation returns a NEW matrix with its own buffer; inputs are never
//   aliased or modified. The only in-place mutation is `set()`. This is what
//   lets a model hand out the result of a forward pass without worrying about
//   later training steps changing it underneath the caller.
//
// ACCELERATION:
//
//   add/sub/mul (matrix and scalar forms) and dot first offer the work to the
//   process-wide Accelerator (see accel.rs). If it is unavailable or returns
//   nothing, the host computes the same result. The `*_with` variants take an
//   explicit accelerator handle instead of the global one.
//
// MEMORY LAYOUT (row-major):
//
//   [[1, 2, 3],
//    [4, 5, 6]]   →  data = [1, 2, 3, 4, 5, 6], element (i, j) at i*cols + j

/// A dense, row-major, 2-D matrix of f64.
///
/// # Example
/// ```
/// use synapse_core::Matrix;
///
/// let a = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0])?;
/// let b = Matrix::identity(2);
/// let c = a.dot(&b)?;
/// assert_eq!(c.to_array(), vec![1.0, 2.0, 3.0, 4.0]);
/// # Ok::<(), synapse_core::Error>(())
/// ```
#[derive(Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix(shape={}, data={:?})", self.shape(), self.data)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}", self.shape())?;
        for row in self.data.chunks(self.cols.max(1)) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:>10.4}")).collect();
            writeln!(f, "  [{}]", cells.join(", "))?;
        }
        Ok(())
    }
}

impl Matrix {
    // Creation

    /// Create a matrix from a row-major buffer.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        let expected = rows * cols;
        if data.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape: Shape::new(rows, cols),
                expected,
                got: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Internal constructor for buffers whose length is known to be right.
    fn from_parts(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), rows * cols);
        Matrix { rows, cols, data }
    }

    /// A matrix filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, 0.0)
    }

    /// A matrix filled with ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::full(rows, cols, 1.0)
    }

    /// A matrix filled with a constant value.
    pub fn full(rows: usize, cols: usize, value: f64) -> Self {
        Self::from_parts(rows, cols, vec![value; rows * cols])
    }

    /// The n x n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        m
    }

    /// A matrix with entries drawn uniformly from [-scale, scale].
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, scale: f64, rng: &mut R) -> Self {
        let data = (0..rows * cols)
            .map(|_| (rng.gen::<f64>() * 2.0 - 1.0) * scale)
            .collect();
        Self::from_parts(rows, cols, data)
    }

    /// A column vector [n x 1] from a flat slice.
    ///
    /// This is the boundary adapter used by the network: callers hand in plain
    /// arrays and receive plain arrays back via [`Matrix::to_array`].
    pub fn from_array(values: &[f64]) -> Self {
        Self::from_parts(values.len(), 1, values.to_vec())
    }

    /// A row vector [1 x n] from a flat slice.
    pub fn row_vector(values: &[f64]) -> Self {
        Self::from_parts(1, values.len(), values.to_vec())
    }

    /// Build a matrix from nested rows. All rows must have the same length.
    pub fn from_2d(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::RaggedRows {
                    row: i,
                    expected: cols,
                    got: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self::from_parts(rows.len(), cols, data))
    }

    // Accessors

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    /// Total number of elements.
    pub fn elem_count(&self) -> usize {
        self.data.len()
    }

    /// The row-major buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Consume the matrix, returning its row-major buffer.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Copy the contents out as a flat row-major array.
    pub fn to_array(&self) -> Vec<f64> {
        self.data.clone()
    }

    /// Copy the contents out as nested rows.
    pub fn to_2d(&self) -> Vec<Vec<f64>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.data.chunks(self.cols).map(|r| r.to_vec()).collect()
    }

    fn check_index(&self, row: usize, col: usize) -> Result<usize> {
        if row >= self.rows || col >= self.cols {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                shape: self.shape(),
            });
        }
        Ok(row * self.cols + col)
    }

    /// Element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        let idx = self.check_index(row, col)?;
        Ok(self.data[idx])
    }

    /// Overwrite the element at (row, col). The only in-place mutation.
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let idx = self.check_index(row, col)?;
        self.data[idx] = value;
        Ok(())
    }

    /// Row `i` as a [1 x cols] matrix.
    pub fn row(&self, i: usize) -> Result<Matrix> {
        self.narrow_rows(i, 1)
    }

    /// Rows `start..start+len` as a new matrix.
    pub fn narrow_rows(&self, start: usize, len: usize) -> Result<Matrix> {
        if start.checked_add(len).map_or(true, |end| end > self.rows) {
            return Err(Error::msg(format!(
                "narrow_rows out of bounds: start {start}, len {len}, rows {}",
                self.rows
            )));
        }
        let data = self.data[start * self.cols..(start + len) * self.cols].to_vec();
        Ok(Self::from_parts(len, self.cols, data))
    }

    /// Columns `start..start+len` as a new matrix.
    pub fn narrow_cols(&self, start: usize, len: usize) -> Result<Matrix> {
        if start.checked_add(len).map_or(true, |end| end > self.cols) {
            return Err(Error::msg(format!(
                "narrow_cols out of bounds: start {start}, len {len}, cols {}",
                self.cols
            )));
        }
        if self.cols == 0 {
            return Ok(Self::from_parts(self.rows, 0, Vec::new()));
        }
        let mut data = Vec::with_capacity(self.rows * len);
        for row in self.data.chunks(self.cols) {
            data.extend_from_slice(&row[start..start + len]);
        }
        Ok(Self::from_parts(self.rows, len, data))
    }

    /// Concatenate matrices side by side. All must have the same row count.
    pub fn concat_cols(parts: &[Matrix]) -> Result<Matrix> {
        let first = match parts.first() {
            Some(f) => f,
            None => return Err(Error::msg("concat_cols: empty matrix list")),
        };
        for p in &parts[1..] {
            if p.rows != first.rows {
                return Err(Error::DimensionMismatch {
                    op: "concat_cols",
                    lhs: first.shape(),
                    rhs: p.shape(),
                });
            }
        }
        let cols: usize = parts.iter().map(|p| p.cols).sum();
        let mut data = Vec::with_capacity(first.rows * cols);
        for i in 0..first.rows {
            for p in parts {
                data.extend_from_slice(&p.data[i * p.cols..(i + 1) * p.cols]);
            }
        }
        Ok(Self::from_parts(first.rows, cols, data))
    }

    /// Gather rows by index: out[r] = self[indices[r]].
    pub fn gather_rows(&self, indices: &[usize]) -> Result<Matrix> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &idx in indices {
            if idx >= self.rows {
                return Err(Error::IndexOutOfBounds {
                    row: idx,
                    col: 0,
                    shape: self.shape(),
                });
            }
            data.extend_from_slice(&self.data[idx * self.cols..(idx + 1) * self.cols]);
        }
        Ok(Self::from_parts(indices.len(), self.cols, data))
    }

    /// Flat index of the largest element (first one on ties), None if empty.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    // Element-wise transforms

    /// Apply `f` to every element, returning a new matrix.
    pub fn map<F: Fn(f64) -> f64>(&self, f: F) -> Matrix {
        Self::from_parts(self.rows, self.cols, self.data.iter().map(|&v| f(v)).collect())
    }

    /// Apply `f(value, row, col)` to every element.
    pub fn map_indexed<F: Fn(f64, usize, usize) -> f64>(&self, f: F) -> Matrix {
        let cols = self.cols.max(1);
        let data = self
            .data
            .iter()
            .enumerate()
            .map(|(idx, &v)| f(v, idx / cols, idx % cols))
            .collect();
        Self::from_parts(self.rows, self.cols, data)
    }

    /// Transform every row in place of a copy: `f(input_row, output_row)`.
    ///
    /// The output row has the same width as the input row.
    pub fn map_rows<F: FnMut(&[f64], &mut [f64])>(&self, mut f: F) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        if self.cols > 0 {
            for (src, dst) in self.data.chunks(self.cols).zip(data.chunks_mut(self.cols)) {
                f(src, dst);
            }
        }
        Self::from_parts(self.rows, self.cols, data)
    }

    /// The transposed matrix.
    pub fn transpose(&self) -> Matrix {
        let mut data = vec![0.0; self.data.len()];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Self::from_parts(self.cols, self.rows, data)
    }

    // Binary arithmetic

    fn check_same_shape(&self, rhs: &Matrix, op: &'static str) -> Result<()> {
        if self.shape() != rhs.shape() {
            return Err(Error::DimensionMismatch {
                op,
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        Ok(())
    }

    /// Element-wise `self <op> rhs` on the given accelerator, host fallback.
    pub fn elementwise_with(
        &self,
        op: ElementwiseOp,
        rhs: &Matrix,
        accel: &dyn Accelerator,
    ) -> Result<Matrix> {
        self.check_same_shape(rhs, op.name())?;
        let operand = Operand::Matrix(&rhs.data);
        let data = match accel.elementwise(op, &self.data, operand) {
            Some(out) if out.len() == self.data.len() => out,
            _ => accel::host_elementwise(op, &self.data, operand),
        };
        Ok(Self::from_parts(self.rows, self.cols, data))
    }

    /// Element-wise `self <op> scalar` on the given accelerator, host fallback.
    pub fn scalar_with(&self, op: ElementwiseOp, scalar: f64, accel: &dyn Accelerator) -> Matrix {
        let operand = Operand::Scalar(scalar);
        let data = match accel.elementwise(op, &self.data, operand) {
            Some(out) if out.len() == self.data.len() => out,
            _ => accel::host_elementwise(op, &self.data, operand),
        };
        Self::from_parts(self.rows, self.cols, data)
    }

    /// Element-wise sum. Shapes must be identical.
    pub fn add(&self, rhs: &Matrix) -> Result<Matrix> {
        self.elementwise_with(ElementwiseOp::Add, rhs, accel::global())
    }

    /// Element-wise difference. Shapes must be identical.
    pub fn sub(&self, rhs: &Matrix) -> Result<Matrix> {
        self.elementwise_with(ElementwiseOp::Sub, rhs, accel::global())
    }

    /// Element-wise (Hadamard) product. Shapes must be identical.
    pub fn mul(&self, rhs: &Matrix) -> Result<Matrix> {
        self.elementwise_with(ElementwiseOp::Mul, rhs, accel::global())
    }

    pub fn add_scalar(&self, scalar: f64) -> Matrix {
        self.scalar_with(ElementwiseOp::Add, scalar, accel::global())
    }

    pub fn sub_scalar(&self, scalar: f64) -> Matrix {
        self.scalar_with(ElementwiseOp::Sub, scalar, accel::global())
    }

    pub fn mul_scalar(&self, scalar: f64) -> Matrix {
        self.scalar_with(ElementwiseOp::Mul, scalar, accel::global())
    }

    /// Add a [1 x cols] row to every row of `self`.
    ///
    /// This is the only broadcasting operation in synapse; it exists for bias
    /// addition in position-wise layers. Everything else requires identical
    /// shapes.
    pub fn add_row_broadcast(&self, row: &Matrix) -> Result<Matrix> {
        if row.rows != 1 || row.cols != self.cols {
            return Err(Error::DimensionMismatch {
                op: "add_row_broadcast",
                lhs: self.shape(),
                rhs: row.shape(),
            });
        }
        let mut data = self.data.clone();
        if self.cols > 0 {
            for out_row in data.chunks_mut(self.cols) {
                for (o, &b) in out_row.iter_mut().zip(&row.data) {
                    *o += b;
                }
            }
        }
        Ok(Self::from_parts(self.rows, self.cols, data))
    }

    // Matrix product

    /// Matrix product on the given accelerator, host fallback.
    pub fn dot_with(&self, rhs: &Matrix, accel: &dyn Accelerator) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(Error::DimensionMismatch {
                op: "dot",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        let (m, k, n) = (self.rows, self.cols, rhs.cols);
        let data = match accel.matmul(&self.data, m, k, &rhs.data, n) {
            Some(out) if out.len() == m * n => out,
            _ => accel::host_matmul(&self.data, m, k, &rhs.data, n),
        };
        Ok(Self::from_parts(m, n, data))
    }

    /// Standard matrix product: [m x k] · [k x n] → [m x n].
    pub fn dot(&self, rhs: &Matrix) -> Result<Matrix> {
        self.dot_with(rhs, accel::global())
    }
}
