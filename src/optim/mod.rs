//! Optimizers and learning-rate schedules

mod adam;
mod clip;
mod optimizer;
mod scheduler;


pub use adam::Adam;
pub use clip::clip_grad_norm;
pub use optimizer::Optimizer;
pub use scheduler::{CyclicLR, CyclicMode, LRScheduler};
