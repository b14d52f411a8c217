//! Binary cross-entropy on logits with optional class weighting

use crate::autograd::{sigmoid_scalar, BackwardOp, GradCell};
use crate::error::{Error, Result};
use crate::Tensor;
use ndarray::Array1;
use std::rc::Rc;

/// Trait for loss functions
pub trait LossFn {
    /// Scalar loss wired into the predictions' graph
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor>;

    fn name(&self) -> &str;
}

/// Per-class multipliers indexed by label value
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights {
    weights: Vec<f32>,
}

impl ClassWeights {
    /// Weights must be finite and non-negative
    pub fn new(weights: Vec<f32>) -> Result<Self> {
        if weights.is_empty() {
            return Err(Error::InvalidParameter(
                "class weights must cover at least one class".to_string(),
            ));
        }
        if let Some(w) = weights.iter().find(|w| !(w.is_finite() && **w >= 0.0)) {
            return Err(Error::InvalidParameter(format!(
                "class weight {w} must be finite and non-negative"
            )));
        }
        Ok(Self { weights })
    }

    /// Inverse-frequency weights `n / (k * n_c)`, so each class contributes
    /// equally in expectation
    pub fn balanced(label_counts: &[usize]) -> Result<Self> {
        let total: usize = label_counts.iter().sum();
        if label_counts.contains(&0) {
            return Err(Error::InvalidParameter(format!(
                "cannot balance classes with no samples: counts {label_counts:?}"
            )));
        }
        let k = label_counts.len() as f32;
        Self::new(
            label_counts
                .iter()
                .map(|&count| total as f32 / (k * count as f32))
                .collect(),
        )
    }

    pub fn num_classes(&self) -> usize {
        self.weights.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    /// Weight for one label; fractional labels truncate toward zero
    pub fn weight_for(&self, label: f32) -> Result<f32> {
        let invalid = Error::InvalidLabel {
            label,
            num_classes: self.weights.len(),
        };
        if !(label >= 0.0) {
            return Err(invalid);
        }
        self.weights.get(label as usize).copied().ok_or(invalid)
    }

    /// Per-sample weights for a target vector
    pub fn sample_weights(&self, targets: &Tensor) -> Result<Array1<f32>> {
        targets
            .data()
            .iter()
            .map(|&label| self.weight_for(label))
            .collect::<Result<Vec<f32>>>()
            .map(Array1::from)
    }
}

/// `mean_i w_i * [max(x_i, 0) - x_i * y_i + ln(1 + exp(-|x_i|))]`
///
/// The sigmoid is folded into the loss for numerical stability. Without class
/// weights every `w_i` is one.
///
/// # Example
///
/// ```
/// use abandono::train::{BinaryCrossEntropyWithLogits, LossFn};
/// use abandono::Tensor;
///
/// let loss_fn = BinaryCrossEntropyWithLogits::new();
/// let logits = Tensor::from_vec(vec![0.0, 0.0], true);
/// let targets = Tensor::from_vec(vec![0.0, 1.0], false);
///
/// let loss = loss_fn.forward(&logits, &targets).unwrap();
/// assert!((loss.item() - std::f32::consts::LN_2).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BinaryCrossEntropyWithLogits {
    weights: Option<ClassWeights>,
}

impl BinaryCrossEntropyWithLogits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn weighted(weights: ClassWeights) -> Self {
        Self {
            weights: Some(weights),
        }
    }

    pub fn class_weights(&self) -> Option<&ClassWeights> {
        self.weights.as_ref()
    }

    /// Loss with explicit per-sample weights (`None` = unweighted)
    pub fn forward_with_weights(
        &self,
        logits: &Tensor,
        targets: &Tensor,
        sample_weights: Option<&Array1<f32>>,
    ) -> Result<Tensor> {
        let n = logits.len();
        if targets.len() != n {
            return Err(Error::ShapeMismatch {
                expected: vec![n],
                got: vec![targets.len()],
            });
        }
        if let Some(w) = sample_weights {
            if w.len() != n {
                return Err(Error::ShapeMismatch {
                    expected: vec![n],
                    got: vec![w.len()],
                });
            }
        }
        if n == 0 {
            return Err(Error::ShapeMismatch {
                expected: vec![1],
                got: vec![0],
            });
        }

        let weights = sample_weights
            .cloned()
            .unwrap_or_else(|| Array1::ones(n));
        let x = logits.data();
        let y = targets.data();

        let total: f32 = x
            .iter()
            .zip(y.iter())
            .zip(weights.iter())
            .map(|((&x, &y), &w)| w * (x.max(0.0) - x * y + (-x.abs()).exp().ln_1p()))
            .sum();
        let scale = 1.0 / n as f32;

        let mut loss = Tensor::scalar(total * scale, logits.requires_grad());

        if logits.requires_grad() {
            // ∂L/∂x_i = w_i * (σ(x_i) - y_i) / n
            let grad = ndarray::Zip::from(x)
                .and(y)
                .and(&weights)
                .map_collect(|&x, &y, &w| w * (sigmoid_scalar(x) - y) * scale);
            loss.set_backward_op(Rc::new(BceWithLogitsBackward {
                logits: logits.clone(),
                grad,
                result_grad: loss.grad_cell(),
            }));
        }

        Ok(loss)
    }
}

impl LossFn for BinaryCrossEntropyWithLogits {
    fn forward(&self, predictions: &Tensor, targets: &Tensor) -> Result<Tensor> {
        let weights = self
            .weights
            .as_ref()
            .map(|w| w.sample_weights(targets))
            .transpose()?;
        self.forward_with_weights(predictions, targets, weights.as_ref())
    }

    fn name(&self) -> &str {
        "BinaryCrossEntropyWithLogits"
    }
}

struct BceWithLogitsBackward {
    logits: Tensor,
    grad: Array1<f32>,
    result_grad: GradCell,
}

impl BackwardOp for BceWithLogitsBackward {
    fn backward(&self) {
        let upstream = self
            .result_grad
            .borrow()
            .as_ref()
            .and_then(|g| g.first().copied())
            .unwrap_or(1.0);
        self.logits.accumulate_grad(&self.grad * upstream);

        if let Some(op) = self.logits.backward_op() {
            op.backward();
        }
    }
}
