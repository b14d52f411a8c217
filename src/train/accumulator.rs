//! Epoch-scoped loss collection

/// Per-batch losses of one validation or test epoch.
///
/// Owned by the loop driving the epoch and handed to each step hook, which
/// clears it on the first batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LossAccumulator {
    losses: Vec<f32>,
}

impl LossAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear when `batch_idx` starts a new epoch
    pub fn begin_batch(&mut self, batch_idx: usize) {
        if batch_idx == 0 {
            self.losses.clear();
        }
    }

    pub fn push(&mut self, loss: f32) {
        self.losses.push(loss);
    }

    pub fn clear(&mut self) {
        self.losses.clear();
    }

    pub fn len(&self) -> usize {
        self.losses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.losses
    }

    /// Unweighted mean over batches; `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.losses.is_empty() {
            return None;
        }
        Some(self.losses.iter().sum::<f32>() / self.losses.len() as f32)
    }
}
