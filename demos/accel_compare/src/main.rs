//! Accelerator Compare — host vs. the installed accelerator.
//!
//! Run with: `cargo run --release -p example-accel-compare --features cuda`
//!
//! Without the `cuda` feature (or without a usable GPU) the probe fails, a
//! warning is logged once, and both columns below are computed on the host.
//!
//! This example shows:
//!   1. Installing the process-wide accelerator
//!   2. Agreement between accelerated and host results
//!   3. Host vs. accelerated timing for matmul and element-wise add

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use synapse::prelude::*;
use synapse::ElementwiseOp;
use tracing_subscriber::EnvFilter;

fn max_abs_diff(a: &Matrix, b: &Matrix) -> f64 {
    a.data()
        .iter()
        .zip(b.data())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

fn time<F: FnMut() -> Result<Matrix>>(iters: u32, mut f: F) -> Result<std::time::Duration> {
    f()?; // warmup
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed() / iters)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Synapse — Accelerator Compare ===\n");

    // ── 1. Install ──────────────────────────────────────────────────────
    let start = Instant::now();
    let accel = init_accelerator();
    let available = accel.is_available();
    println!("1. Accelerator:    {} ({:?})", accel.name(), accel.state());
    println!("   Probe:          {:.2?}\n", start.elapsed());

    // ── 2. Agreement ────────────────────────────────────────────────────
    println!("2. Accelerated vs. host results...");
    let mut rng = StdRng::seed_from_u64(0);
    let a = Matrix::random(64, 48, 1.0, &mut rng);
    let b = Matrix::random(48, 32, 1.0, &mut rng);
    let c = Matrix::random(64, 48, 1.0, &mut rng);

    let dot_diff = max_abs_diff(&a.dot(&b)?, &a.dot_with(&b, &HostOnly)?);
    let add_diff = max_abs_diff(&a.add(&c)?, &a.elementwise_with(ElementwiseOp::Add, &c, &HostOnly)?);
    let mul_diff = max_abs_diff(
        &a.mul_scalar(0.5),
        &a.scalar_with(ElementwiseOp::Mul, 0.5, &HostOnly),
    );
    println!("   dot       max |Δ| = {dot_diff:.3e}");
    println!("   add       max |Δ| = {add_diff:.3e}");
    println!("   scalar ×  max |Δ| = {mul_diff:.3e}\n");

    // ── 3. Timing ───────────────────────────────────────────────────────
    println!("3. Timing ({}):", if available { "device vs. host" } else { "host only" });
    println!("   {:>20}  {:>12}  {:>12}", "op", "host", "active");

    for &n in &[64usize, 128, 256] {
        let x = Matrix::random(n, n, 1.0, &mut rng);
        let y = Matrix::random(n, n, 1.0, &mut rng);
        let iters = if n <= 128 { 20 } else { 5 };
        let host = time(iters, || x.dot_with(&y, &HostOnly))?;
        let active = time(iters, || x.dot(&y))?;
        println!("   {:>20}  {:>12.2?}  {:>12.2?}", format!("matmul [{n}x{n}]"), host, active);
    }

    for &n in &[1_000usize, 100_000] {
        let x = Matrix::random(1, n, 1.0, &mut rng);
        let y = Matrix::random(1, n, 1.0, &mut rng);
        let host = time(20, || x.elementwise_with(ElementwiseOp::Add, &y, &HostOnly))?;
        let active = time(20, || x.add(&y))?;
        println!("   {:>20}  {:>12.2?}  {:>12.2?}", format!("add [{n}]"), host, active);
    }

    println!("\nDone!");
    Ok(())
}
