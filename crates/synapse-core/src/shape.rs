use std::fmt;

// Shape — (rows, cols) of a dense matrix
//
// Everything in synapse is a 2-D matrix, so a shape is just a pair. It exists
// as its own type mostly so error messages can name the offending operands:
//
//   dimension mismatch in add: [3x4] vs [4x3]
//
// A column vector of n values is [nx1]; a row vector is [1xn].

/// The (rows, cols) shape of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        Shape { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total number of elements (rows * cols).
    pub fn elem_count(&self) -> usize {
        self.rows * self.cols
    }

    /// Whether this is a square matrix.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// The shape of the transposed matrix.
    pub fn transposed(&self) -> Shape {
        Shape::new(self.cols, self.rows)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}x{}]", self.rows, self.cols)
    }
}

// Convenient From implementation
// Lets you write: Shape::from((3, 4)) instead of Shape::new(3, 4)

impl From<(usize, usize)> for Shape {
    fn from((rows, cols): (usize, usize)) -> Self {
        Shape::new(rows, cols)
    }
}
