//! Trainable logit models

mod mlp;

pub use mlp::Mlp;

use crate::error::{Error, Result};
use crate::io::ModelState;
use crate::Tensor;

/// A differentiable function from a feature batch to one logit per row.
///
/// Parameters live in the model; `forward` builds the graph from clones that
/// share their gradient cells, so after backward the optimizer can step
/// `params_mut()` directly.
pub trait Model {
    /// `inputs` is `rows × input_dim`, flattened. Returns `rows` logits.
    fn forward(&self, inputs: &Tensor, rows: usize) -> Result<Tensor>;

    fn params(&self) -> &[Tensor];

    fn params_mut(&mut self) -> &mut [Tensor];

    fn state(&self) -> ModelState;

    /// Overwrite parameter values from a snapshot of the same architecture
    fn load_state(&mut self, state: &ModelState) -> Result<()> {
        let params = self.params_mut();
        if state.parameters.len() != params.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![params.len()],
                got: vec![state.parameters.len()],
            });
        }
        for (param, saved) in params.iter_mut().zip(&state.parameters) {
            if saved.data.len() != param.len() {
                return Err(Error::ShapeMismatch {
                    expected: vec![param.len()],
                    got: vec![saved.data.len()],
                });
            }
            param
                .data_mut()
                .assign(&ndarray::ArrayView1::from(saved.data.as_slice()));
        }
        Ok(())
    }

    fn num_parameters(&self) -> usize {
        self.params().iter().map(Tensor::len).sum()
    }
}
