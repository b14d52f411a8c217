//! Feed-forward network producing a single logit

use super::Model;
use crate::autograd::{linear, relu};
use crate::error::{Error, Result};
use crate::io::{ModelState, ParameterState};
use crate::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Multi-layer perceptron `in → hidden.. → 1` with ReLU between layers.
///
/// With `dims = [in, 1]` this is logistic regression.
#[derive(Debug, Clone)]
pub struct Mlp {
    dims: Vec<usize>,
    /// weight, bias, weight, bias, ...
    params: Vec<Tensor>,
}

impl Mlp {
    /// Xavier-uniform weights and zero biases, drawn from `seed`
    pub fn new(dims: &[usize], seed: u64) -> Result<Self> {
        if dims.len() < 2 || dims.contains(&0) {
            return Err(Error::InvalidParameter(format!(
                "MLP needs at least input and output widths, all non-zero; got {dims:?}"
            )));
        }
        if dims.last() != Some(&1) {
            return Err(Error::InvalidParameter(format!(
                "MLP output width must be 1 for a binary logit; got {dims:?}"
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = Vec::with_capacity(2 * (dims.len() - 1));
        for pair in dims.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
            let weights = (0..fan_in * fan_out)
                .map(|_| rng.random_range(-limit..limit))
                .collect();
            params.push(Tensor::from_vec(weights, true));
            params.push(Tensor::zeros(fan_out, true));
        }

        Ok(Self {
            dims: dims.to_vec(),
            params,
        })
    }

    /// Single linear layer
    pub fn logistic(input_dim: usize, seed: u64) -> Result<Self> {
        Self::new(&[input_dim, 1], seed)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn input_dim(&self) -> usize {
        self.dims[0]
    }

    fn num_layers(&self) -> usize {
        self.dims.len() - 1
    }
}

impl Model for Mlp {
    fn forward(&self, inputs: &Tensor, rows: usize) -> Result<Tensor> {
        let mut hidden = inputs.clone();
        for layer in 0..self.num_layers() {
            let (w, b) = (&self.params[2 * layer], &self.params[2 * layer + 1]);
            hidden = linear(
                &hidden,
                w,
                b,
                rows,
                self.dims[layer],
                self.dims[layer + 1],
            )?;
            if layer + 1 < self.num_layers() {
                hidden = relu(&hidden);
            }
        }
        Ok(hidden)
    }

    fn params(&self) -> &[Tensor] {
        &self.params
    }

    fn params_mut(&mut self) -> &mut [Tensor] {
        &mut self.params
    }

    fn state(&self) -> ModelState {
        let parameters = self
            .params
            .iter()
            .enumerate()
            .map(|(i, tensor)| {
                let layer = i / 2;
                let (name, shape) = if i % 2 == 0 {
                    ("weight", vec![self.dims[layer], self.dims[layer + 1]])
                } else {
                    ("bias", vec![self.dims[layer + 1]])
                };
                ParameterState {
                    name: format!("layer{layer}.{name}"),
                    shape,
                    data: tensor.to_vec(),
                }
            })
            .collect();

        ModelState {
            architecture: format!("mlp{:?}", self.dims),
            parameters,
        }
    }
}
