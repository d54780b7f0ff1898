// Activations — Scalar nonlinearities, softmax, and name-based dispatch
//
// Two families live here:
//
// 1. SCALAR FUNCTIONS used element-wise through Matrix::map:
//
//      sigmoid(x) = 1 / (1 + e^-x)        dsigmoid(s) = s·(1 - s)
//      relu(x)    = max(0, x)             drelu(a)    = 1 if a > 0 else 0
//      tanh(x)                            dtanh(t)    = 1 - t²
//      gelu(x)    = 0.5·x·(1 + tanh(√(2/π)·(x + 0.044715·x³)))
//
//    The derivatives take the ACTIVATED value, not the pre-activation. The
//    network only keeps activated outputs around, so that is what it has.
//
// 2. SOFTMAX over a vector, each row, or each column of a matrix. The max is
//    subtracted before exponentiating. A slice that is entirely -inf (a fully
//    masked attention row) produces all zeros instead of NaN.
//
// DISPATCH:
//
//   A network names its activations in configuration ("sigmoid", "relu", ...).
//   The name parses into `Activation`, which is resolved ONCE into a
//   `ResolvedActivation` holding plain fn pointers. Nothing is looked up by
//   name on the training hot path.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use synapse_core::{Error, Matrix, Result};

// Scalar functions

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of sigmoid, given the already-activated value `s`.
pub fn dsigmoid(s: f64) -> f64 {
    s * (1.0 - s)
}

pub fn relu(x: f64) -> f64 {
    x.max(0.0)
}

/// Derivative of relu, given the already-activated value.
pub fn drelu(a: f64) -> f64 {
    if a > 0.0 {
        1.0
    } else {
        0.0
    }
}

pub fn tanh(x: f64) -> f64 {
    x.tanh()
}

/// Derivative of tanh, given the already-activated value `t`.
pub fn dtanh(t: f64) -> f64 {
    1.0 - t * t
}

/// GELU, tanh approximation.
pub fn gelu(x: f64) -> f64 {
    let c = (2.0 / PI).sqrt();
    0.5 * x * (1.0 + (c * (x + 0.044715 * x * x * x)).tanh())
}

// Softmax

/// Numerically stable softmax of a slice.
///
/// Returns all zeros when every input is -inf.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; values.len()];
    softmax_into(values, &mut out);
    out
}

fn softmax_into(values: &[f64], out: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        out.fill(0.0);
        return;
    }
    let mut sum = 0.0;
    for (o, &v) in out.iter_mut().zip(values) {
        *o = (v - max).exp();
        sum += *o;
    }
    for o in out.iter_mut() {
        *o /= sum;
    }
}

/// Softmax applied independently to every row.
pub fn softmax_rows(m: &Matrix) -> Matrix {
    m.map_rows(softmax_into)
}

/// Softmax applied independently to every column.
///
/// The feed-forward network stores one example per column, so this is the
/// form its softmax output layer uses.
pub fn softmax_cols(m: &Matrix) -> Matrix {
    softmax_rows(&m.transpose()).transpose()
}

/// Combined gradient of a softmax output layer under cross-entropy loss:
/// `output - target`.
///
/// Valid ONLY for that pairing. Any other activation/loss combination needs
/// the activation derivative and the loss gradient separately.
pub fn softmax_cross_entropy_grad(output: &Matrix, target: &Matrix) -> Result<Matrix> {
    output.sub(target)
}

// Dispatch

/// A named activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Sigmoid,
    Relu,
    Tanh,
    Softmax,
}

impl Activation {
    pub fn name(self) -> &'static str {
        match self {
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
            Activation::Tanh => "tanh",
            Activation::Softmax => "softmax",
        }
    }

    /// Resolve into the fn pointers used during training.
    pub fn resolve(self) -> ResolvedActivation {
        let (apply, derivative): (fn(f64) -> f64, fn(f64) -> f64) = match self {
            Activation::Sigmoid => (sigmoid, dsigmoid),
            Activation::Relu => (relu, drelu),
            Activation::Tanh => (tanh, dtanh),
            // Softmax is not element-wise; `apply` is unused for it. Its
            // element-wise derivative has the same form as sigmoid's.
            Activation::Softmax => (sigmoid, dsigmoid),
        };
        ResolvedActivation {
            kind: self,
            apply,
            derivative,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::Relu),
            "tanh" => Ok(Activation::Tanh),
            "softmax" => Ok(Activation::Softmax),
            other => Err(Error::config(format!("unknown activation '{other}'"))),
        }
    }
}

/// An activation resolved to function pointers.
#[derive(Clone, Copy)]
pub struct ResolvedActivation {
    kind: Activation,
    apply: fn(f64) -> f64,
    derivative: fn(f64) -> f64,
}

impl fmt::Debug for ResolvedActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedActivation({})", self.kind)
    }
}

impl ResolvedActivation {
    pub fn kind(&self) -> Activation {
        self.kind
    }

    /// Activate a matrix whose columns are examples.
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self.kind {
            Activation::Softmax => softmax_cols(z),
            _ => z.map(self.apply),
        }
    }

    /// Element-wise derivative evaluated at the activated values `a`.
    pub fn derivative(&self, a: &Matrix) -> Matrix {
        a.map(self.derivative)
    }
}
