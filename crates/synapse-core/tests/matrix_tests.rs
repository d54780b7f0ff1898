// Matrix engine integration tests: arithmetic laws, error reporting, and the
// accelerator fallback contract.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::SeedableRng;
use synapse_core::{
    Accelerator, AcceleratorState, ElementwiseOp, Error, HostOnly, Matrix, Operand, Shape,
};

fn assert_vec_approx(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(got.len(), expected.len(), "length mismatch");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).abs() <= tol, "index {i}: got {g}, expected {e} (tol={tol})");
    }
}

/// A fake device that computes in f32, the way a real GPU backend does, and
/// counts how often it was asked to work.
#[derive(Debug, Default)]
struct SinglePrecision {
    calls: AtomicUsize,
}

impl Accelerator for SinglePrecision {
    fn name(&self) -> String {
        "f32-fake".into()
    }

    fn state(&self) -> AcceleratorState {
        AcceleratorState::Ready
    }

    fn matmul(&self, a: &[f64], m: usize, k: usize, b: &[f64], n: usize) -> Option<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut out = vec![0.0f32; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut acc = 0.0f32;
                for l in 0..k {
                    acc += a[i * k + l] as f32 * b[l * n + j] as f32;
                }
                out[i * n + j] = acc;
            }
        }
        Some(out.into_iter().map(f64::from).collect())
    }

    fn elementwise(&self, op: ElementwiseOp, a: &[f64], rhs: Operand<'_>) -> Option<Vec<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = match rhs {
            Operand::Matrix(b) => a
                .iter()
                .zip(b)
                .map(|(&x, &y)| op.apply(x as f32 as f64, y as f32 as f64) as f32 as f64)
                .collect(),
            Operand::Scalar(s) => a
                .iter()
                .map(|&x| op.apply(x as f32 as f64, s as f32 as f64) as f32 as f64)
                .collect(),
        };
        Some(out)
    }
}

/// A broken device that always answers with the wrong number of elements.
#[derive(Debug)]
struct Truncating;

impl Accelerator for Truncating {
    fn name(&self) -> String {
        "truncating".into()
    }

    fn state(&self) -> AcceleratorState {
        AcceleratorState::Ready
    }

    fn matmul(&self, _a: &[f64], _m: usize, _k: usize, _b: &[f64], _n: usize) -> Option<Vec<f64>> {
        Some(vec![0.0])
    }

    fn elementwise(&self, _op: ElementwiseOp, _a: &[f64], _rhs: Operand<'_>) -> Option<Vec<f64>> {
        Some(Vec::new())
    }
}

#[test]
fn test_transpose_is_involution() {
    let mut rng = StdRng::seed_from_u64(1);
    let a = Matrix::random(4, 7, 1.0, &mut rng);
    assert_eq!(a.transpose().transpose(), a);
    assert_eq!(a.transpose().shape(), Shape::new(7, 4));
}

#[test]
fn test_dot_identity() -> synapse_core::Result<()> {
    let mut rng = StdRng::seed_from_u64(2);
    let a = Matrix::random(3, 5, 2.0, &mut rng);
    let left = Matrix::identity(3).dot_with(&a, &HostOnly)?;
    let right = a.dot_with(&Matrix::identity(5), &HostOnly)?;
    assert_eq!(left, a);
    assert_eq!(right, a);
    Ok(())
}

#[test]
fn test_dot_transpose_law() -> synapse_core::Result<()> {
    // (A·B)ᵀ = Bᵀ·Aᵀ
    let mut rng = StdRng::seed_from_u64(3);
    let a = Matrix::random(3, 4, 1.0, &mut rng);
    let b = Matrix::random(4, 2, 1.0, &mut rng);
    let lhs = a.dot_with(&b, &HostOnly)?.transpose();
    let rhs = b.transpose().dot_with(&a.transpose(), &HostOnly)?;
    assert_vec_approx(lhs.data(), rhs.data(), 1e-12);
    Ok(())
}

#[test]
fn test_dimension_mismatch_reports_both_shapes() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(2, 3);
    let err = a.dot_with(&b, &HostOnly).unwrap_err();
    match &err {
        Error::DimensionMismatch { op, lhs, rhs } => {
            assert_eq!(*op, "dot");
            assert_eq!(*lhs, Shape::new(2, 3));
            assert_eq!(*rhs, Shape::new(2, 3));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "dimension mismatch in dot: [2x3] vs [2x3]");

    let err = a
        .elementwise_with(ElementwiseOp::Sub, &Matrix::zeros(3, 2), &HostOnly)
        .unwrap_err();
    assert_eq!(err.to_string(), "dimension mismatch in sub: [2x3] vs [3x2]");
}

#[test]
fn test_random_is_deterministic_per_seed() {
    let a = Matrix::random(5, 5, 1.0, &mut StdRng::seed_from_u64(42));
    let b = Matrix::random(5, 5, 1.0, &mut StdRng::seed_from_u64(42));
    let c = Matrix::random(5, 5, 1.0, &mut StdRng::seed_from_u64(43));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_accelerated_results_match_host() -> synapse_core::Result<()> {
    let device = SinglePrecision::default();
    let mut rng = StdRng::seed_from_u64(4);
    let a = Matrix::random(16, 12, 1.0, &mut rng);
    let b = Matrix::random(12, 9, 1.0, &mut rng);
    let c = Matrix::random(16, 12, 1.0, &mut rng);

    let dev = a.dot_with(&b, &device)?;
    let host = a.dot_with(&b, &HostOnly)?;
    assert_vec_approx(dev.data(), host.data(), 1e-4);

    for op in [ElementwiseOp::Add, ElementwiseOp::Sub, ElementwiseOp::Mul] {
        let dev = a.elementwise_with(op, &c, &device)?;
        let host = a.elementwise_with(op, &c, &HostOnly)?;
        assert_vec_approx(dev.data(), host.data(), 1e-5);

        let dev = a.scalar_with(op, 0.3, &device);
        let host = a.scalar_with(op, 0.3, &HostOnly);
        assert_vec_approx(dev.data(), host.data(), 1e-5);
    }

    assert_eq!(device.calls.load(Ordering::SeqCst), 7);
    Ok(())
}

#[test]
fn test_wrong_length_result_falls_back_to_host() -> synapse_core::Result<()> {
    let a = Matrix::new(2, 2, vec![1.0, 2.0, 3.0, 4.0])?;
    let b = Matrix::new(2, 1, vec![5.0, 6.0])?;
    assert_eq!(a.dot_with(&b, &Truncating)?.to_array(), vec![17.0, 39.0]);
    assert_eq!(
        a.elementwise_with(ElementwiseOp::Add, &a, &Truncating)?.to_array(),
        vec![2.0, 4.0, 6.0, 8.0]
    );
    Ok(())
}

#[test]
fn test_global_default_is_host() -> synapse_core::Result<()> {
    // Nothing installs a device in this test binary.
    let accel = synapse_core::accel::global();
    assert_eq!(accel.name(), "host");
    assert!(!accel.is_available());

    let a = Matrix::from_2d(&[vec![1.0, 2.0], vec![3.0, 4.0]])?;
    assert_eq!(a.add(&a)?.to_2d(), vec![vec![2.0, 4.0], vec![6.0, 8.0]]);
    assert_eq!(a.mul_scalar(0.5).to_array(), vec![0.5, 1.0, 1.5, 2.0]);
    Ok(())
}
