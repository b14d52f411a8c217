//! Learning rate schedulers

use super::Optimizer;
use serde::{Deserialize, Serialize};

/// Learning rate scheduler trait
pub trait LRScheduler {
    /// Learning rate for the current step
    fn get_lr(&self) -> f32;

    /// Advance one step (one epoch or one batch, depending on how it is driven)
    fn step(&mut self);

    /// Momentum for the current step, if the schedule cycles it
    fn get_momentum(&self) -> Option<f32> {
        None
    }

    /// Push the current values into an optimizer
    fn apply(&self, optimizer: &mut dyn Optimizer) {
        optimizer.set_lr(self.get_lr());
        if let Some(momentum) = self.get_momentum() {
            optimizer.set_momentum(momentum);
        }
    }
}

/// Amplitude policy of a [`CyclicLR`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclicMode {
    /// Constant amplitude
    Triangular,
    /// Amplitude halves every cycle
    Triangular2,
    /// Amplitude scaled by `gamma^step`
    ExpRange,
}

/// Cyclical learning rate
///
/// Ramps linearly from `base_lr` to `max_lr` over `step_size_up` steps, then back
/// down over `step_size_down` steps, and repeats. With `r = up / (up + down)`:
///
/// ```text
/// cycle = floor(1 + t / (up + down))
/// x     = 1 + t / (up + down) - cycle
/// scale = x / r              if x <= r
///       = (x - 1) / (r - 1)  otherwise
/// lr    = base_lr + (max_lr - base_lr) * scale * amplitude(cycle, t)
/// ```
///
/// When momentum cycling is enabled the momentum moves against the rate, from
/// `max_momentum` at the trough to `base_momentum` at the peak.
#[derive(Debug, Clone)]
pub struct CyclicLR {
    base_lr: f32,
    max_lr: f32,
    step_size_up: usize,
    step_size_down: usize,
    mode: CyclicMode,
    gamma: f32,
    momentum_range: Option<(f32, f32)>,
    current_step: usize,
}

impl CyclicLR {
    /// Triangular schedule without momentum cycling.
    ///
    /// A zero `step_size_down` mirrors `step_size_up`; a zero `step_size_up` is
    /// treated as one step.
    pub fn new(base_lr: f32, max_lr: f32, step_size_up: usize, step_size_down: usize) -> Self {
        let step_size_up = step_size_up.max(1);
        let step_size_down = if step_size_down == 0 {
            step_size_up
        } else {
            step_size_down
        };
        Self {
            base_lr,
            max_lr,
            step_size_up,
            step_size_down,
            mode: CyclicMode::Triangular,
            gamma: 1.0,
            momentum_range: None,
            current_step: 0,
        }
    }

    pub fn with_mode(mut self, mode: CyclicMode) -> Self {
        self.mode = mode;
        self
    }

    /// Decay base for [`CyclicMode::ExpRange`]; the other modes ignore it
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Cycle the optimizer's momentum inversely between the two values
    pub fn with_momentum_cycling(mut self, base_momentum: f32, max_momentum: f32) -> Self {
        self.momentum_range = Some((base_momentum, max_momentum));
        self
    }

    pub fn mode(&self) -> CyclicMode {
        self.mode
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn cycle_len(&self) -> usize {
        self.step_size_up + self.step_size_down
    }

    fn cycle_position(&self) -> (f32, f32) {
        let total = self.cycle_len() as f32;
        let step_ratio = self.step_size_up as f32 / total;
        let progress = self.current_step as f32 / total;
        let cycle = (1.0 + progress).floor();
        let x = 1.0 + progress - cycle;

        let scale = if x <= step_ratio {
            x / step_ratio
        } else {
            (x - 1.0) / (step_ratio - 1.0)
        };
        (scale, cycle)
    }

    fn amplitude(&self, cycle: f32) -> f32 {
        match self.mode {
            CyclicMode::Triangular => 1.0,
            CyclicMode::Triangular2 => 1.0 / 2f32.powf(cycle - 1.0),
            CyclicMode::ExpRange => self.gamma.powi(self.current_step as i32),
        }
    }
}

impl LRScheduler for CyclicLR {
    fn get_lr(&self) -> f32 {
        let (scale, cycle) = self.cycle_position();
        self.base_lr + (self.max_lr - self.base_lr) * scale * self.amplitude(cycle)
    }

    fn step(&mut self) {
        self.current_step += 1;
    }

    fn get_momentum(&self) -> Option<f32> {
        let (base_m, max_m) = self.momentum_range?;
        let (scale, cycle) = self.cycle_position();
        Some(max_m - (max_m - base_m) * scale * self.amplitude(cycle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::Adam;
    use approx::assert_abs_diff_eq;

    fn churn_schedule() -> CyclicLR {
        CyclicLR::new(1e-4, 0.01, 5, 10)
    }

    fn step_to(scheduler: &mut CyclicLR, t: usize) {
        while scheduler.current_step() < t {
            scheduler.step();
        }
    }

    #[test]
    fn test_starts_at_base_lr() {
        assert_abs_diff_eq!(churn_schedule().get_lr(), 1e-4, epsilon = 1e-9);
    }

    #[test]
    fn test_triangular_waveform() {
        let mut scheduler = churn_schedule();

        step_to(&mut scheduler, 5);
        assert_abs_diff_eq!(scheduler.get_lr(), 0.01, epsilon = 1e-7);

        // Two thirds into the cycle: halfway down the longer descent
        step_to(&mut scheduler, 10);
        assert_abs_diff_eq!(scheduler.get_lr(), 1e-4 + 0.0099 * 0.5, epsilon = 1e-6);

        step_to(&mut scheduler, 15);
        assert_abs_diff_eq!(scheduler.get_lr(), 1e-4, epsilon = 1e-7);

        // Second peak matches the first
        step_to(&mut scheduler, 20);
        assert_abs_diff_eq!(scheduler.get_lr(), 0.01, epsilon = 1e-6);
    }

    #[test]
    fn test_rise_is_faster_than_fall() {
        let mut scheduler = churn_schedule();
        let lrs: Vec<f32> = (0..15)
            .map(|_| {
                let lr = scheduler.get_lr();
                scheduler.step();
                lr
            })
            .collect();

        let rise = lrs[1] - lrs[0];
        let fall = lrs[6] - lrs[7];
        assert!(rise > fall);
        assert!(rise > 0.0 && fall > 0.0);
    }

    #[test]
    fn test_triangular_ignores_gamma() {
        let mut plain = churn_schedule();
        let mut with_gamma = churn_schedule().with_gamma(0.5);
        step_to(&mut plain, 20);
        step_to(&mut with_gamma, 20);
        assert_abs_diff_eq!(plain.get_lr(), with_gamma.get_lr());
    }

    #[test]
    fn test_triangular2_halves_each_cycle() {
        let mut scheduler = churn_schedule().with_mode(CyclicMode::Triangular2);
        step_to(&mut scheduler, 20);
        assert_abs_diff_eq!(scheduler.get_lr(), 1e-4 + 0.0099 * 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_exp_range_decays_with_gamma() {
        let mut scheduler = churn_schedule()
            .with_mode(CyclicMode::ExpRange)
            .with_gamma(0.5);
        step_to(&mut scheduler, 5);
        assert_abs_diff_eq!(
            scheduler.get_lr(),
            1e-4 + 0.0099 * 0.5f32.powi(5),
            epsilon = 1e-7
        );
    }

    #[test]
    fn test_momentum_moves_against_lr() {
        let mut scheduler = churn_schedule().with_momentum_cycling(0.8, 0.9);
        assert_abs_diff_eq!(scheduler.get_momentum().unwrap(), 0.9, epsilon = 1e-6);

        step_to(&mut scheduler, 5);
        assert_abs_diff_eq!(scheduler.get_momentum().unwrap(), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_apply_sets_optimizer() {
        let mut optimizer = Adam::default_params(0.5);
        let scheduler = churn_schedule().with_momentum_cycling(0.8, 0.9);

        scheduler.apply(&mut optimizer);

        assert_abs_diff_eq!(optimizer.lr(), 1e-4, epsilon = 1e-9);
        assert_abs_diff_eq!(optimizer.momentum().unwrap(), 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_step_sizes_are_normalised() {
        let scheduler = CyclicLR::new(0.1, 1.0, 0, 0);
        assert_eq!(scheduler.cycle_len(), 2);
    }
}
