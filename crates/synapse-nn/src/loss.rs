// Loss functions
//
//   sum_squared_error:  Σ (pred - target)²
//
// The feed-forward network reports the mean over examples of the per-example
// sum of squared errors, whatever its output activation.

use synapse_core::{Error, Result, Shape};

fn check_len(prediction: &[f64], target: &[f64], op: &'static str) -> Result<()> {
    if prediction.len() != target.len() {
        return Err(Error::DimensionMismatch {
            op,
            lhs: Shape::new(prediction.len(), 1),
            rhs: Shape::new(target.len(), 1),
        });
    }
    Ok(())
}

/// Σ (prediction - target)².
pub fn sum_squared_error(prediction: &[f64], target: &[f64]) -> Result<f64> {
    check_len(prediction, target, "sum_squared_error")?;
    Ok(prediction
        .iter()
        .zip(target)
        .map(|(p, t)| (p - t) * (p - t))
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_squared_error() {
        assert_eq!(sum_squared_error(&[1.0, 2.0], &[0.0, 4.0]).unwrap(), 5.0);
        assert!(sum_squared_error(&[1.0], &[1.0, 2.0]).is_err());
    }
}
