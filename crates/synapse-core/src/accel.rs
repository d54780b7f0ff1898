use std::fmt;
use std::sync::{Arc, OnceLock};

// Accelerator — Optional offload of the two hottest matrix operations
//
// Matrix product and element-wise add/sub/mul dominate the cost of both the
// feed-forward network and the transformer stack. An Accelerator is a device
// that may be able to run those two operations faster than the host.
//
// The contract is intentionally weak: every method returns Option. `None`
// means "I could not do it", and the caller (Matrix) computes the same result
// on the host instead. An accelerator never returns an error and never
// panics, so the fallback is mandatory and invisible to the models.
//
// LIFECYCLE:
//
//   Uninitialized ──probe ok──▶ Ready
//        │
//        └──probe failed──▶ ProbeFailed   (latched for the process lifetime)
//
// PROCESS-WIDE HANDLE:
//
// Matrix operations retrieve a single process-wide accelerator through
// `global()`. It is init-once: `install()` may be called at most once, before
// the first matrix operation, and `global()` falls back to `HostOnly` when
// nothing was installed. Tests that must not touch a device pass an explicit
// handle to the `*_with` matrix methods instead.

/// Lifecycle state of an accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceleratorState {
    /// No probe has been attempted yet.
    Uninitialized,
    /// The device and its programs are ready.
    Ready,
    /// Probing failed; every call returns `None` from now on.
    ProbeFailed,
}

/// Element-wise binary operations that can be offloaded.
///
/// The selector values are what the device program receives as its
/// operation uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementwiseOp {
    Add,
    Sub,
    Mul,
}

impl ElementwiseOp {
    /// Operation selector passed to device programs: 0=add, 1=sub, 2=mul.
    pub fn selector(self) -> u32 {
        match self {
            ElementwiseOp::Add => 0,
            ElementwiseOp::Sub => 1,
            ElementwiseOp::Mul => 2,
        }
    }

    /// Apply the operation to two host values.
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ElementwiseOp::Add => a + b,
            ElementwiseOp::Sub => a - b,
            ElementwiseOp::Mul => a * b,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementwiseOp::Add => "add",
            ElementwiseOp::Sub => "sub",
            ElementwiseOp::Mul => "mul",
        }
    }
}

/// Right-hand operand of an element-wise operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// A buffer with the same length as the left-hand side.
    Matrix(&'a [f64]),
    /// A scalar applied to every element.
    Scalar(f64),
}

/// A compute device able to run matrix product and element-wise arithmetic.
///
/// All buffers are row-major. Implementations return `None` whenever they
/// cannot produce a result, for whatever reason.
pub trait Accelerator: Send + Sync + fmt::Debug {
    /// Human-readable name (e.g. "host", "cuda:0").
    fn name(&self) -> String;

    /// Current lifecycle state. May trigger a lazy probe.
    fn state(&self) -> AcceleratorState;

    /// Whether calls can currently produce results.
    fn is_available(&self) -> bool {
        self.state() == AcceleratorState::Ready
    }

    /// Dense product of an [m x k] matrix `a` with a [k x n] matrix `b`.
    /// Returns the [m x n] result.
    fn matmul(&self, a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Option<Vec<f64>>;

    /// Element-wise `a <op> rhs`.
    fn elementwise(&self, op: ElementwiseOp, a: &[f64], rhs: Operand<'_>) -> Option<Vec<f64>>;
}

/// The accelerator that never accelerates: every call computes on the host.
///
/// This is what `global()` hands out when no device was installed, and what
/// tests inject to force the host path.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostOnly;

impl Accelerator for HostOnly {
    fn name(&self) -> String {
        "host".to_string()
    }

    fn state(&self) -> AcceleratorState {
        AcceleratorState::ProbeFailed
    }

    fn matmul(&self, _a: &[f64], _m: usize, _k: usize, _b: &[f64], _n: usize) -> Option<Vec<f64>> {
        None
    }

    fn elementwise(&self, _op: ElementwiseOp, _a: &[f64], _rhs: Operand<'_>) -> Option<Vec<f64>> {
        None
    }
}

static GLOBAL: OnceLock<Arc<dyn Accelerator>> = OnceLock::new();

/// Install the process-wide accelerator.
///
/// Succeeds only once, and only before the first call to [`global`]. On
/// failure the rejected handle is returned to the caller.
pub fn install(accel: Arc<dyn Accelerator>) -> std::result::Result<(), Arc<dyn Accelerator>> {
    let name = accel.name();
    GLOBAL.set(accel)?;
    tracing::debug!(accelerator = %name, "installed process-wide accelerator");
    Ok(())
}

/// The process-wide accelerator. Defaults to [`HostOnly`].
pub fn global() -> &'static dyn Accelerator {
    GLOBAL.get_or_init(|| Arc::new(HostOnly)).as_ref()
}

/// Host implementation of [`Accelerator::elementwise`], shared by Matrix and
/// by device backends that want to validate their output.
pub fn host_elementwise(op: ElementwiseOp, a: &[f64], rhs: Operand<'_>) -> Vec<f64> {
    match rhs {
        Operand::Matrix(b) => a.iter().zip(b).map(|(&x, &y)| op.apply(x, y)).collect(),
        Operand::Scalar(s) => a.iter().map(|&x| op.apply(x, s)).collect(),
    }
}

/// Host implementation of [`Accelerator::matmul`]: O(m·k·n), i-k-j loop order
/// so the innermost loop walks both `b` and the output row contiguously.
pub fn host_matmul(a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![0.0; m * n];
    for i in 0..m {
        let out_row = &mut out[i * n..(i + 1) * n];
        for l in 0..k {
            let a_val = a[i * k + l];
            let b_row = &b[l * n..(l + 1) * n];
            for (o, &b_val) in out_row.iter_mut().zip(b_row) {
                *o += a_val * b_val;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_only_never_produces() {
        let h = HostOnly;
        assert_eq!(h.state(), AcceleratorState::ProbeFailed);
        assert!(!h.is_available());
        assert!(h.matmul(&[1.0], 1, 1, &[2.0], 1).is_none());
        assert!(h
            .elementwise(ElementwiseOp::Add, &[1.0], Operand::Scalar(1.0))
            .is_none());
    }

    #[test]
    fn test_selectors() {
        assert_eq!(ElementwiseOp::Add.selector(), 0);
        assert_eq!(ElementwiseOp::Sub.selector(), 1);
        assert_eq!(ElementwiseOp::Mul.selector(), 2);
    }

    #[test]
    fn test_host_matmul() {
        // [1 2; 3 4] @ [5; 6] = [17; 39]
        let out = host_matmul(&[1.0, 2.0, 3.0, 4.0], 2, 2, &[5.0, 6.0], 1);
        assert_eq!(out, vec![17.0, 39.0]);
    }

    #[test]
    fn test_host_elementwise_scalar() {
        let out = host_elementwise(ElementwiseOp::Sub, &[1.0, 2.0], Operand::Scalar(0.5));
        assert_eq!(out, vec![0.5, 1.5]);
    }
}
