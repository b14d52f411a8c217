//! Flat `f32` tensor with a shared gradient cell

use super::BackwardOp;
use ndarray::Array1;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared gradient slot. Clones of a tensor point at the same cell, so gradients
/// written during backward are visible to the parameter held by the model.
pub type GradCell = Rc<RefCell<Option<Array1<f32>>>>;

/// Tensor with automatic differentiation support.
///
/// Matrices are stored flattened in row-major order; the op that consumes them
/// carries the shape.
#[derive(Clone)]
pub struct Tensor {
    data: Array1<f32>,
    grad: GradCell,
    backward_op: Option<Rc<dyn BackwardOp>>,
    requires_grad: bool,
}

impl Tensor {
    pub fn new(data: Array1<f32>, requires_grad: bool) -> Self {
        Self {
            data,
            grad: Rc::new(RefCell::new(None)),
            backward_op: None,
            requires_grad,
        }
    }

    pub fn from_vec(data: Vec<f32>, requires_grad: bool) -> Self {
        Self::new(Array1::from(data), requires_grad)
    }

    pub fn zeros(size: usize, requires_grad: bool) -> Self {
        Self::new(Array1::zeros(size), requires_grad)
    }

    /// Scalar tensor (used for losses)
    pub fn scalar(value: f32, requires_grad: bool) -> Self {
        Self::from_vec(vec![value], requires_grad)
    }

    pub fn data(&self) -> &Array1<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array1<f32> {
        &mut self.data
    }

    /// First element; the value of a scalar loss
    pub fn item(&self) -> f32 {
        self.data.first().copied().unwrap_or(0.0)
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.to_vec()
    }

    pub fn grad(&self) -> Option<Array1<f32>> {
        self.grad.borrow().clone()
    }

    pub fn set_grad(&self, grad: Array1<f32>) {
        *self.grad.borrow_mut() = Some(grad);
    }

    /// Add to the stored gradient, initialising it on first use
    pub fn accumulate_grad(&self, grad: Array1<f32>) {
        let mut slot = self.grad.borrow_mut();
        match slot.as_mut() {
            Some(existing) => *existing += &grad,
            None => *slot = Some(grad),
        }
    }

    pub fn zero_grad(&self) {
        *self.grad.borrow_mut() = None;
    }

    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    pub fn grad_cell(&self) -> GradCell {
        self.grad.clone()
    }

    pub fn set_backward_op(&mut self, op: Rc<dyn BackwardOp>) {
        self.backward_op = Some(op);
    }

    pub fn backward_op(&self) -> Option<Rc<dyn BackwardOp>> {
        self.backward_op.clone()
    }

    /// Copy of the data with no graph attached
    pub fn detach(&self) -> Tensor {
        Tensor::new(self.data.clone(), false)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("data", &self.data)
            .field("grad", &self.grad.borrow())
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}
