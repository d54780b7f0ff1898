// Evaluation metrics
//
// argmax, one_hot, accuracy, ConfusionMatrix
//
// Classification follows the usual convention: a prediction is the argmax of
// the network output, a target is the argmax of its one-hot vector.

/// Index of the largest value (first one on ties), None for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// A vector of `size` zeros with a 1 at `index`. Out-of-range `index` gives
/// all zeros.
pub fn one_hot(index: usize, size: usize) -> Vec<f64> {
    let mut v = vec![0.0; size];
    if let Some(slot) = v.get_mut(index) {
        *slot = 1.0;
    }
    v
}

/// Classification accuracy: fraction of correct predictions.
pub fn accuracy(predictions: &[usize], targets: &[usize]) -> f64 {
    if predictions.is_empty() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(targets.iter())
        .filter(|(p, t)| p == t)
        .count();
    correct as f64 / predictions.len() as f64
}

/// NxN confusion matrix. Entry [i][j] = count of samples with true class i
/// predicted as class j.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub matrix: Vec<Vec<u64>>,
    pub n_classes: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against targets. Indices >= n_classes are skipped.
    pub fn from_predictions(predictions: &[usize], targets: &[usize], n_classes: usize) -> Self {
        let mut matrix = vec![vec![0u64; n_classes]; n_classes];
        for (&p, &t) in predictions.iter().zip(targets) {
            if p < n_classes && t < n_classes {
                matrix[t][p] += 1;
            }
        }
        ConfusionMatrix { matrix, n_classes }
    }

    /// Correctly classified samples (the diagonal).
    pub fn correct(&self) -> u64 {
        (0..self.n_classes).map(|c| self.matrix[c][c]).sum()
    }

    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_and_one_hot() {
        assert_eq!(argmax(&[0.1, 0.9, 0.9]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(one_hot(2, 4), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(one_hot(7, 3), vec![0.0; 3]);
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[1, 2, 3, 0], &[1, 2, 0, 0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_confusion_matrix() {
        let cm = ConfusionMatrix::from_predictions(&[0, 1, 1, 2], &[0, 1, 2, 2], 3);
        assert_eq!(cm.correct(), 3);
        assert_eq!(cm.total(), 4);
        assert_eq!(cm.matrix[2][1], 1);
    }
}
