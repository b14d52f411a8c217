//! Differentiable operations

use super::{BackwardOp, GradCell, Tensor};
use crate::error::{Error, Result};
use ndarray::{Array1, Array2, Axis};
use std::rc::Rc;

fn as_matrix(t: &Tensor, rows: usize, cols: usize) -> Result<Array2<f32>> {
    if t.len() != rows * cols {
        return Err(Error::ShapeMismatch {
            expected: vec![rows, cols],
            got: vec![t.len()],
        });
    }
    t.data()
        .view()
        .into_shape_with_order((rows, cols))
        .map(|view| view.to_owned())
        .map_err(|_| Error::ShapeMismatch {
            expected: vec![rows, cols],
            got: vec![t.len()],
        })
}

/// Affine layer `y = x @ w + b`
///
/// - `x` is `rows × in_dim`, flattened
/// - `w` is `in_dim × out_dim`, flattened
/// - `b` has length `out_dim` and is broadcast over rows
///
/// Returns `rows × out_dim`, flattened.
pub fn linear(
    x: &Tensor,
    w: &Tensor,
    b: &Tensor,
    rows: usize,
    in_dim: usize,
    out_dim: usize,
) -> Result<Tensor> {
    let x_mat = as_matrix(x, rows, in_dim)?;
    let w_mat = as_matrix(w, in_dim, out_dim)?;
    if b.len() != out_dim {
        return Err(Error::ShapeMismatch {
            expected: vec![out_dim],
            got: vec![b.len()],
        });
    }

    let out = x_mat.dot(&w_mat) + b.data();
    let requires_grad = x.requires_grad() || w.requires_grad() || b.requires_grad();
    let mut result = Tensor::new(Array1::from_iter(out.iter().copied()), requires_grad);

    if requires_grad {
        result.set_backward_op(Rc::new(LinearBackward {
            x: x.clone(),
            w: w.clone(),
            b: b.clone(),
            x_mat,
            w_mat,
            result_grad: result.grad_cell(),
        }));
    }

    Ok(result)
}

struct LinearBackward {
    x: Tensor,
    w: Tensor,
    b: Tensor,
    x_mat: Array2<f32>,
    w_mat: Array2<f32>,
    result_grad: GradCell,
}

impl BackwardOp for LinearBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().clone() else {
            return;
        };
        let (rows, out_dim) = (self.x_mat.nrows(), self.w_mat.ncols());
        let Ok(grad) = grad.into_shape_with_order((rows, out_dim)) else {
            return;
        };

        // ∂L/∂x = g @ wᵀ, ∂L/∂w = xᵀ @ g, ∂L/∂b = Σ_rows g
        if self.x.requires_grad() {
            let grad_x = grad.dot(&self.w_mat.t());
            self.x
                .accumulate_grad(Array1::from_iter(grad_x.iter().copied()));
        }
        if self.w.requires_grad() {
            let grad_w = self.x_mat.t().dot(&grad);
            self.w
                .accumulate_grad(Array1::from_iter(grad_w.iter().copied()));
        }
        if self.b.requires_grad() {
            self.b.accumulate_grad(grad.sum_axis(Axis(0)));
        }

        for input in [&self.x, &self.w, &self.b] {
            if let Some(op) = input.backward_op() {
                op.backward();
            }
        }
    }
}

/// ReLU activation
pub fn relu(a: &Tensor) -> Tensor {
    let data = a.data().mapv(|x| x.max(0.0));
    let mut result = Tensor::new(data, a.requires_grad());

    if a.requires_grad() {
        result.set_backward_op(Rc::new(ReluBackward {
            a: a.clone(),
            result_grad: result.grad_cell(),
        }));
    }

    result
}

struct ReluBackward {
    a: Tensor,
    result_grad: GradCell,
}

impl BackwardOp for ReluBackward {
    fn backward(&self) {
        let Some(grad) = self.result_grad.borrow().clone() else {
            return;
        };
        // ∂L/∂a = ∂L/∂out * (a > 0)
        let mask = self.a.data().mapv(|x| if x > 0.0 { 1.0 } else { 0.0 });
        self.a.accumulate_grad(grad * &mask);

        if let Some(op) = self.a.backward_op() {
            op.backward();
        }
    }
}

/// Element-wise logistic function. Inference only: the result carries no graph.
pub fn sigmoid(a: &Tensor) -> Tensor {
    Tensor::new(a.data().mapv(sigmoid_scalar), false)
}

pub(crate) fn sigmoid_scalar(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}
