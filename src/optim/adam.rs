//! Adam optimizer

use super::Optimizer;
use crate::Tensor;
use ndarray::Array1;

/// Adam (Adaptive Moment Estimation) with optional L2 weight decay.
///
/// Weight decay is coupled: `wd * θ` is added to the gradient before the
/// moment estimates are updated, so it is rescaled by the adaptive step like
/// any other gradient component.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    weight_decay: f32,
    t: u64,
    m: Vec<Option<Array1<f32>>>,
    v: Vec<Option<Array1<f32>>>,
}

impl Adam {
    pub fn new(lr: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            lr,
            beta1,
            beta2,
            epsilon,
            weight_decay: 0.0,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Adam with betas (0.9, 0.999) and epsilon 1e-8
    pub fn default_params(lr: f32) -> Self {
        Self::new(lr, 0.9, 0.999, 1e-8)
    }

    pub fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    pub fn weight_decay(&self) -> f32 {
        self.weight_decay
    }

    pub fn betas(&self) -> (f32, f32) {
        (self.beta1, self.beta2)
    }

    /// Number of steps taken so far
    pub fn steps(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, params: &[Tensor]) {
        if self.m.len() != params.len() {
            self.m = params.iter().map(|_| None).collect();
            self.v = params.iter().map(|_| None).collect();
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [Tensor]) {
        self.ensure_moments(params);
        self.t += 1;

        let bias1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias2 = 1.0 - self.beta2.powi(self.t as i32);
        let lr_t = self.lr * bias2.sqrt() / bias1;

        for (i, param) in params.iter_mut().enumerate() {
            let Some(mut grad) = param.grad() else {
                continue;
            };
            if self.weight_decay != 0.0 {
                grad = grad + param.data() * self.weight_decay;
            }

            // m_t = β1 * m_{t-1} + (1 - β1) * g
            let m_t = match &self.m[i] {
                Some(m) => m * self.beta1 + &grad * (1.0 - self.beta1),
                None => &grad * (1.0 - self.beta1),
            };

            // v_t = β2 * v_{t-1} + (1 - β2) * g²
            let grad_sq = &grad * &grad;
            let v_t = match &self.v[i] {
                Some(v) => v * self.beta2 + &grad_sq * (1.0 - self.beta2),
                None => &grad_sq * (1.0 - self.beta2),
            };

            // θ_t = θ_{t-1} - lr_t * m_t / (√v_t + ε)
            let update = &m_t / &(v_t.mapv(f32::sqrt) + self.epsilon) * lr_t;
            *param.data_mut() -= &update;

            self.m[i] = Some(m_t);
            self.v[i] = Some(v_t);
        }
    }

    fn lr(&self) -> f32 {
        self.lr
    }

    fn set_lr(&mut self, lr: f32) {
        self.lr = lr;
    }

    fn momentum(&self) -> Option<f32> {
        Some(self.beta1)
    }

    fn set_momentum(&mut self, momentum: f32) {
        self.beta1 = momentum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_adam_quadratic_convergence() {
        // f(x) = x², ∇f = 2x
        let mut params = vec![Tensor::from_vec(vec![5.0, -3.0, 2.0], true)];
        let mut optimizer = Adam::default_params(0.1);

        for _ in 0..100 {
            let grad = params[0].data().mapv(|x| 2.0 * x);
            params[0].set_grad(grad);
            optimizer.step(&mut params);
        }

        for &val in params[0].data().iter() {
            assert!(val.abs() < 0.5, "Value {} did not converge", val);
        }
    }

    #[test]
    fn test_first_step_moves_by_lr() {
        // With bias correction the first Adam step has magnitude ≈ lr
        let mut params = vec![Tensor::from_vec(vec![1.0], true)];
        params[0].set_grad(ndarray::arr1(&[0.5]));

        let mut optimizer = Adam::default_params(0.01);
        optimizer.step(&mut params);

        assert_abs_diff_eq!(params[0].data()[0], 0.99, epsilon = 1e-5);
        assert_eq!(optimizer.steps(), 1);
    }

    #[test]
    fn test_weight_decay_shrinks_with_zero_gradient() {
        let mut decayed = vec![Tensor::from_vec(vec![2.0, -2.0], true)];
        let mut plain = vec![Tensor::from_vec(vec![2.0, -2.0], true)];

        let mut with_wd = Adam::default_params(0.01).with_weight_decay(1e-4);
        let mut without_wd = Adam::default_params(0.01);

        for _ in 0..10 {
            decayed[0].set_grad(ndarray::arr1(&[0.0, 0.0]));
            plain[0].set_grad(ndarray::arr1(&[0.0, 0.0]));
            with_wd.step(&mut decayed);
            without_wd.step(&mut plain);
        }

        assert!(decayed[0].data()[0] < 2.0);
        assert!(decayed[0].data()[1] > -2.0);
        assert_eq!(plain[0].data().to_vec(), vec![2.0, -2.0]);
    }

    #[test]
    fn test_params_without_grad_are_skipped() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        params[1].set_grad(ndarray::arr1(&[1.0]));

        let mut optimizer = Adam::default_params(0.1);
        optimizer.step(&mut params);

        assert_eq!(params[0].data()[0], 1.0);
        assert!(params[1].data()[0] < 1.0);
    }

    #[test]
    fn test_momentum_is_beta1() {
        let mut optimizer = Adam::default_params(0.1);
        assert_eq!(optimizer.momentum(), Some(0.9));
        optimizer.set_momentum(0.8);
        assert_eq!(optimizer.betas(), (0.8, 0.999));
    }
}
