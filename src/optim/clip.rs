//! Gradient clipping

use crate::Tensor;

/// Scale all gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm measured before clipping. Parameters without a gradient
/// are skipped.
pub fn clip_grad_norm(params: &mut [Tensor], max_norm: f32) -> f32 {
    let total_sq: f32 = params
        .iter()
        .filter_map(Tensor::grad)
        .map(|g| g.iter().map(|v| v * v).sum::<f32>())
        .sum();
    let total_norm = total_sq.sqrt();

    if total_norm > max_norm && total_norm > 0.0 {
        let factor = max_norm / (total_norm + 1e-6);
        for param in params.iter() {
            if let Some(grad) = param.grad() {
                param.set_grad(grad * factor);
            }
        }
    }

    total_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clip_large_gradient() {
        let mut params = vec![Tensor::from_vec(vec![1.0, 1.0], true)];
        params[0].set_grad(ndarray::arr1(&[30.0, 40.0]));

        let norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(norm, 50.0, epsilon = 1e-4);
        let grad = params[0].grad().unwrap();
        assert_abs_diff_eq!(grad[0], 0.6, epsilon = 1e-4);
        assert_abs_diff_eq!(grad[1], 0.8, epsilon = 1e-4);
    }

    #[test]
    fn test_small_gradient_untouched() {
        let mut params = vec![
            Tensor::from_vec(vec![1.0], true),
            Tensor::from_vec(vec![1.0], true),
        ];
        params[0].set_grad(ndarray::arr1(&[0.3]));

        let norm = clip_grad_norm(&mut params, 1.0);

        assert_abs_diff_eq!(norm, 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(params[0].grad().unwrap()[0], 0.3);
        assert!(params[1].grad().is_none());
    }
}
