//! Optimizer trait

use crate::Tensor;

/// Trait for optimization algorithms
pub trait Optimizer {
    /// Perform a single optimization step using the gradients stored on `params`
    fn step(&mut self, params: &mut [Tensor]);

    fn zero_grad(&mut self, params: &mut [Tensor]) {
        for param in params {
            param.zero_grad();
        }
    }

    fn lr(&self) -> f32;

    fn set_lr(&mut self, lr: f32);

    /// Momentum term a scheduler may cycle (Adam's beta1). `None` when the
    /// optimizer has no such term.
    fn momentum(&self) -> Option<f32> {
        None
    }

    fn set_momentum(&mut self, _momentum: f32) {}
}
