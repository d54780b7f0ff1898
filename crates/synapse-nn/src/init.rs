// nn::init — Parameter initialization
//
//   uniform(rows, cols, scale, rng)  U(-scale, scale)
//   fan_in_uniform(rows, cols, rng)  U(-k, k), k = sqrt(1 / rows)
//   rng_from_seed(seed)  seeded StdRng, or from entropy
//
// Weight matrices in synapse are stored [in, out] (the input multiplies from
// the left), so fan-in is the row count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use synapse_core::Matrix;

/// A uniform U(-scale, scale) matrix.
pub fn uniform<R: Rng + ?Sized>(rows: usize, cols: usize, scale: f64, rng: &mut R) -> Matrix {
    Matrix::random(rows, cols, scale, rng)
}

/// U(-k, k) with k = sqrt(1 / fan_in), fan_in = `rows`.
pub fn fan_in_uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
    let k = (1.0 / rows.max(1) as f64).sqrt();
    uniform(rows, cols, k, rng)
}

/// A deterministic generator when `seed` is set, entropy-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}
