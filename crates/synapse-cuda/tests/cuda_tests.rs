// Device tests. They compile only with the `cuda` feature and skip at runtime
// when no GPU can be acquired.

#![cfg(feature = "cuda")]

use rand::rngs::StdRng;
use rand::SeedableRng;
use synapse_core::{Accelerator, AcceleratorState, ElementwiseOp, HostOnly, Matrix};
use synapse_cuda::CudaAccelerator;

fn assert_vec_approx(got: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(got.len(), expected.len(), "length mismatch");
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!((g - e).abs() <= tol, "index {i}: got {g}, expected {e} (tol={tol})");
    }
}

fn device() -> Option<CudaAccelerator> {
    let accel = CudaAccelerator::new(0);
    if accel.is_available() {
        Some(accel)
    } else {
        eprintln!("no CUDA device, skipping");
        None
    }
}

#[test]
fn test_dot_matches_host() -> synapse_core::Result<()> {
    let Some(gpu) = device() else { return Ok(()) };
    let mut rng = StdRng::seed_from_u64(11);
    let a = Matrix::random(33, 17, 1.0, &mut rng);
    let b = Matrix::random(17, 29, 1.0, &mut rng);
    let on_gpu = a.dot_with(&b, &gpu)?;
    let on_host = a.dot_with(&b, &HostOnly)?;
    assert_vec_approx(on_gpu.data(), on_host.data(), 1e-4);
    Ok(())
}

#[test]
fn test_elementwise_matches_host() -> synapse_core::Result<()> {
    let Some(gpu) = device() else { return Ok(()) };
    let mut rng = StdRng::seed_from_u64(12);
    let a = Matrix::random(40, 30, 1.0, &mut rng);
    let b = Matrix::random(40, 30, 1.0, &mut rng);
    for op in [ElementwiseOp::Add, ElementwiseOp::Sub, ElementwiseOp::Mul] {
        let on_gpu = a.elementwise_with(op, &b, &gpu)?;
        let on_host = a.elementwise_with(op, &b, &HostOnly)?;
        assert_vec_approx(on_gpu.data(), on_host.data(), 1e-5);

        let on_gpu = a.scalar_with(op, -0.75, &gpu);
        let on_host = a.scalar_with(op, -0.75, &HostOnly);
        assert_vec_approx(on_gpu.data(), on_host.data(), 1e-5);
    }
    Ok(())
}

#[test]
fn test_probe_is_latched() {
    let accel = CudaAccelerator::new(0);
    assert_eq!(accel.state(), AcceleratorState::Uninitialized);
    let first = accel.probe();
    assert_eq!(accel.probe(), first);
    assert_eq!(accel.state(), first);
}
