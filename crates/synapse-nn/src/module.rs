// Module trait — The interface every transformer component implements
//
// forward() maps an input matrix to an output matrix. parameters() lists the
// matrices the component owns, which is what parameter counting, naming and
// inspection work from.
//
// Composite modules (TransformerBlock, TransformerEncoder, Transformer)
// collect their children's parameters and prefix the names with the child's
// field name, e.g. "blocks.0.attention.w_q".

use synapse_core::{Matrix, Result};

/// The common interface of all transformer building blocks.
///
/// # Example
/// ```ignore
/// struct Scale { factor: Matrix }
///
/// impl Module for Scale {
///     fn forward(&self, x: &Matrix) -> Result<Matrix> {
///         x.mul(&self.factor)
///     }
///     fn parameters(&self) -> Vec<&Matrix> {
///         vec![&self.factor]
///     }
/// }
/// ```
pub trait Module {
    /// Compute the output for one input (rows are sequence positions).
    fn forward(&self, x: &Matrix) -> Result<Matrix>;

    /// All parameter matrices owned by this module.
    fn parameters(&self) -> Vec<&Matrix>;

    /// Parameters with human-readable names.
    ///
    /// Leaf modules override this with names like `"gamma"` / `"w_q"`.
    /// The default uses positional indices (`param_0`, `param_1`, …).
    fn named_parameters(&self) -> Vec<(String, &Matrix)> {
        self.parameters()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (format!("param_{i}"), p))
            .collect()
    }

    /// Total number of scalar parameters.
    fn num_parameters(&self) -> usize {
        self.parameters().iter().map(|p| p.elem_count()).sum()
    }
}

/// Prefix every name in `params` with `prefix.`.
pub(crate) fn prefixed<'a>(
    prefix: &str,
    params: Vec<(String, &'a Matrix)>,
) -> Vec<(String, &'a Matrix)> {
    params
        .into_iter()
        .map(|(name, p)| (format!("{prefix}.{name}"), p))
        .collect()
}
