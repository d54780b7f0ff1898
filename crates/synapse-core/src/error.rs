use crate::shape::Shape;

/// All errors that can occur within synapse.
///
/// The taxonomy is deliberately small: shape errors (a programming or
/// integration error at the call site), configuration errors (invalid model
/// hyperparameters) and a catch-all message. An unavailable accelerator is
/// never an error; matrix operations fall back to the host silently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two operands of a binary operation have incompatible shapes
    /// (e.g. adding [2x3] to [3x2], or `dot` with mismatched inner dims).
    #[error("dimension mismatch in {op}: {lhs} vs {rhs}")]
    DimensionMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// Element count mismatch when creating a matrix from a flat buffer.
    #[error("element count mismatch: shape {shape} requires {expected} elements, got {got}")]
    ElementCountMismatch {
        shape: Shape,
        expected: usize,
        got: usize,
    },

    /// Row/column index outside the matrix.
    #[error("index ({row}, {col}) out of bounds for matrix of shape {shape}")]
    IndexOutOfBounds { row: usize, col: usize, shape: Shape },

    /// Nested input whose rows do not all have the same length.
    #[error("ragged rows: row {row} has {got} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        got: usize,
    },

    /// Invalid model hyperparameters or a missing required setting.
    #[error("configuration error: {0}")]
    Config(String),

    /// A sequence is longer than a precomputed table supports.
    #[error("sequence length {len} exceeds maximum {max}")]
    SequenceTooLong { len: usize, max: usize },

    /// Generic message for cases not covered above.
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an error from any string message.
    pub fn msg(s: impl Into<String>) -> Self {
        Error::Msg(s.into())
    }

    /// Create a configuration error.
    pub fn config(s: impl Into<String>) -> Self {
        Error::Config(s.into())
    }
}

/// Convenience Result type used throughout synapse.
pub type Result<T> = std::result::Result<T, Error>;

/// Macro for early return with a formatted error message.
/// Usage: `bail!("something went wrong: {}", detail)`
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::Msg(format!($($arg)*)))
    };
}
