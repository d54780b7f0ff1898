// Dataset records
//
// A DigitRecord is one labelled 28x28 grayscale image as it arrives from a
// dataset loader: 784 pixel intensities in 0..=255 and a class label 0..=9.
// to_example() converts it into what the network trains on: pixels scaled to
// [0, 1] and a one-hot target.

use serde::{Deserialize, Serialize};
use synapse_core::{Error, Result};

use crate::metrics::one_hot;
use crate::network::Example;

/// Pixels per digit image (28 x 28).
pub const DIGIT_PIXELS: usize = 784;

/// Number of digit classes.
pub const DIGIT_CLASSES: usize = 10;

/// One labelled handwritten-digit image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitRecord {
    pub image: Vec<u8>,
    pub label: usize,
}

impl DigitRecord {
    /// Scale pixels to [0, 1] and one-hot encode the label.
    pub fn to_example(&self) -> Result<Example> {
        if self.image.len() != DIGIT_PIXELS {
            return Err(Error::msg(format!(
                "digit image has {} pixels, expected {DIGIT_PIXELS}",
                self.image.len()
            )));
        }
        if self.label >= DIGIT_CLASSES {
            return Err(Error::msg(format!(
                "digit label {} out of range 0..{DIGIT_CLASSES}",
                self.label
            )));
        }
        let input = self.image.iter().map(|&p| f64::from(p) / 255.0).collect();
        Ok(Example::new(input, one_hot(self.label, DIGIT_CLASSES)))
    }
}

/// Convert a batch of records, failing on the first malformed one.
pub fn to_examples(records: &[DigitRecord]) -> Result<Vec<Example>> {
    records.iter().map(DigitRecord::to_example).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_example() {
        let mut image = vec![0u8; DIGIT_PIXELS];
        image[0] = 255;
        image[1] = 51;
        let ex = DigitRecord { image, label: 3 }.to_example().unwrap();
        assert_eq!(ex.input[0], 1.0);
        assert!((ex.input[1] - 0.2).abs() < 1e-12);
        assert_eq!(ex.target[3], 1.0);
        assert_eq!(ex.target.iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_rejects_bad_records() {
        let short = DigitRecord { image: vec![0; 10], label: 1 };
        assert!(short.to_example().is_err());
        let bad_label = DigitRecord { image: vec![0; DIGIT_PIXELS], label: 10 };
        assert!(bad_label.to_example().is_err());
    }

    #[test]
    fn test_deserialize() {
        let rec: DigitRecord = serde_json::from_str(r#"{"image": [1, 2], "label": 4}"#).unwrap();
        assert_eq!(rec.label, 4);
        assert!(to_examples(&[rec]).is_err());
    }
}
