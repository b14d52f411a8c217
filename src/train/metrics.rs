//! Binary classification metrics
//!
//! Predictions are probabilities; a prediction is positive when it reaches the
//! threshold. Targets are positive at 0.5 and above.

use crate::autograd::sigmoid;
use crate::error::{Error, Result};
use crate::Tensor;
use serde::{Deserialize, Serialize};

/// Trait for evaluation metrics
pub trait Metric {
    fn compute(&self, predictions: &Tensor, targets: &Tensor) -> Result<f32>;

    fn name(&self) -> &str;

    fn higher_is_better(&self) -> bool {
        true
    }
}

/// Confusion counts at a threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Confusion {
    tp: usize,
    fp: usize,
    tn: usize,
    fn_: usize,
}

impl Confusion {
    fn count(predictions: &Tensor, targets: &Tensor, threshold: f32) -> Result<Self> {
        if predictions.len() != targets.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![predictions.len()],
                got: vec![targets.len()],
            });
        }

        let mut confusion = Self::default();
        for (&p, &t) in predictions.data().iter().zip(targets.data().iter()) {
            match (p >= threshold, t >= 0.5) {
                (true, true) => confusion.tp += 1,
                (true, false) => confusion.fp += 1,
                (false, false) => confusion.tn += 1,
                (false, true) => confusion.fn_ += 1,
            }
        }
        Ok(confusion)
    }

    fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    fn accuracy(&self) -> f32 {
        ratio(self.tp + self.tn, self.total())
    }

    fn precision(&self) -> f32 {
        ratio(self.tp, self.tp + self.fp)
    }

    fn recall(&self) -> f32 {
        ratio(self.tp, self.tp + self.fn_)
    }

    fn f1(&self) -> f32 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

macro_rules! threshold_metric {
    ($(#[$doc:meta])* $name:ident, $method:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            threshold: f32,
        }

        impl $name {
            pub fn new(threshold: f32) -> Self {
                Self { threshold }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new(0.5)
            }
        }

        impl Metric for $name {
            fn compute(&self, predictions: &Tensor, targets: &Tensor) -> Result<f32> {
                Ok(Confusion::count(predictions, targets, self.threshold)?.$method())
            }

            fn name(&self) -> &str {
                stringify!($name)
            }
        }
    };
}

threshold_metric!(
    /// Fraction of correct predictions
    ///
    /// ```
    /// use abandono::train::{Accuracy, Metric};
    /// use abandono::Tensor;
    ///
    /// let pred = Tensor::from_vec(vec![0.9, 0.2, 0.8], false);
    /// let target = Tensor::from_vec(vec![1.0, 0.0, 1.0], false);
    /// assert_eq!(Accuracy::default().compute(&pred, &target).unwrap(), 1.0);
    /// ```
    Accuracy,
    accuracy
);
threshold_metric!(
    /// True positives over predicted positives
    Precision,
    precision
);
threshold_metric!(
    /// True positives over actual positives
    Recall,
    recall
);
threshold_metric!(
    /// Harmonic mean of precision and recall
    F1Score,
    f1
);

/// All four metrics at one threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1: f32,
}

impl ClassificationReport {
    pub fn from_probabilities(
        probabilities: &Tensor,
        targets: &Tensor,
        threshold: f32,
    ) -> Result<Self> {
        let confusion = Confusion::count(probabilities, targets, threshold)?;
        Ok(Self {
            accuracy: confusion.accuracy(),
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
        })
    }

    /// Applies the sigmoid, then thresholds at 0.5
    pub fn from_logits(logits: &Tensor, targets: &Tensor) -> Result<Self> {
        Self::from_probabilities(&sigmoid(logits), targets, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn t(values: &[f32]) -> Tensor {
        Tensor::from_vec(values.to_vec(), false)
    }

    #[test]
    fn test_precision_recall() {
        let pred = t(&[0.9, 0.8, 0.2, 0.1]);
        let target = t(&[1.0, 0.0, 1.0, 0.0]);

        assert_abs_diff_eq!(Precision::default().compute(&pred, &target).unwrap(), 0.5);
        assert_abs_diff_eq!(Recall::default().compute(&pred, &target).unwrap(), 0.5);
        assert_abs_diff_eq!(F1Score::default().compute(&pred, &target).unwrap(), 0.5);
        assert_abs_diff_eq!(Accuracy::default().compute(&pred, &target).unwrap(), 0.5);
    }

    #[test]
    fn test_no_positive_predictions() {
        let pred = t(&[0.1, 0.2]);
        let target = t(&[1.0, 0.0]);
        assert_eq!(Precision::default().compute(&pred, &target).unwrap(), 0.0);
        assert_eq!(F1Score::default().compute(&pred, &target).unwrap(), 0.0);
    }

    #[test]
    fn test_custom_threshold() {
        let pred = t(&[0.6, 0.4]);
        let target = t(&[1.0, 1.0]);
        assert_eq!(Recall::new(0.7).compute(&pred, &target).unwrap(), 0.0);
        assert_eq!(Recall::new(0.3).compute(&pred, &target).unwrap(), 1.0);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(Accuracy::default().compute(&t(&[0.5]), &t(&[1.0, 0.0])).is_err());
    }

    #[test]
    fn test_report_from_logits() {
        let logits = t(&[3.0, -2.0, 0.5, -0.1]);
        let targets = t(&[1.0, 0.0, 0.0, 1.0]);
        let report = ClassificationReport::from_logits(&logits, &targets).unwrap();

        assert_abs_diff_eq!(report.accuracy, 0.5);
        assert_abs_diff_eq!(report.precision, 0.5);
        assert_abs_diff_eq!(report.recall, 0.5);
        assert_eq!(Accuracy::default().name(), "Accuracy");
    }
}
