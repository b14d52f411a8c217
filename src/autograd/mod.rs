//! Tape-based autograd
//!
//! Just enough differentiation for feed-forward logit models: an affine layer,
//! ReLU, and the binary cross-entropy loss defined in [`crate::train`].

mod backward;
mod ops;
mod tensor;


pub use backward::BackwardOp;
pub use ops::{linear, relu, sigmoid};
pub(crate) use ops::sigmoid_scalar;
pub use tensor::{GradCell, Tensor};

/// Run the backward pass from `tensor`.
///
/// With no explicit `grad_output` the seed gradient is all ones, which is what a
/// scalar loss needs.
pub fn backward(tensor: &Tensor, grad_output: Option<ndarray::Array1<f32>>) {
    let seed = grad_output.unwrap_or_else(|| ndarray::Array1::ones(tensor.len()));
    tensor.set_grad(seed);

    if let Some(op) = tensor.backward_op() {
        op.backward();
    }
}
