//! Batch iteration over a dataset

use super::{Batch, ChurnDataset};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;

/// Iteration policy for one split: batch size and whether to shuffle.
///
/// Each call to [`DataLoader::iter`] starts a new epoch. A shuffling loader draws
/// the permutation for epoch `e` from `seed + e`, so the order changes every
/// epoch but is reproducible across runs.
#[derive(Clone, Debug)]
pub struct DataLoader {
    dataset: Arc<ChurnDataset>,
    batch_size: usize,
    shuffle: bool,
    seed: u64,
    epoch: u64,
}

impl DataLoader {
    /// Sequential loader; a zero batch size is treated as one
    pub fn new(dataset: Arc<ChurnDataset>, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            shuffle: false,
            seed: 0,
            epoch: 0,
        }
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn shuffles(&self) -> bool {
        self.shuffle
    }

    pub fn dataset(&self) -> &Arc<ChurnDataset> {
        &self.dataset
    }

    /// Epochs started so far
    pub fn epochs_started(&self) -> u64 {
        self.epoch
    }

    /// Batches per epoch (the last one may be short)
    pub fn len(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Sample order used for `epoch`
    pub fn epoch_order(&self, epoch: u64) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch));
            order.shuffle(&mut rng);
        }
        order
    }

    /// Lazy batches for the next epoch
    pub fn iter(&mut self) -> Batches {
        let order = self.epoch_order(self.epoch);
        self.epoch += 1;
        Batches {
            dataset: Arc::clone(&self.dataset),
            order,
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// One epoch's worth of batches, collated on demand
#[derive(Debug)]
pub struct Batches {
    dataset: Arc<ChurnDataset>,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.gather(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dataset(n: usize) -> Arc<ChurnDataset> {
        let rows: Vec<Vec<f32>> = (0..n).map(|i| vec![i as f32, 2.0 * i as f32]).collect();
        let labels = (0..n).map(|i| (i % 2) as f32).collect();
        Arc::new(ChurnDataset::from_rows(&rows, labels).unwrap())
    }

    fn first_column(batch: &Batch) -> Vec<f32> {
        batch.inputs.data().iter().step_by(batch.cols).copied().collect()
    }

    #[test]
    fn test_sequential_batches() {
        let mut loader = DataLoader::new(dataset(5), 2);
        assert_eq!(loader.len(), 3);

        let batches: Vec<Batch> = loader.iter().collect();
        assert_eq!(batches.len(), 3);
        assert_eq!(first_column(&batches[0]), vec![0.0, 1.0]);
        assert_eq!(first_column(&batches[2]), vec![4.0]);
        assert_eq!(batches[2].targets.to_vec(), vec![0.0]);
    }

    #[test]
    fn test_iteration_restarts() {
        let mut loader = DataLoader::new(dataset(4), 3);
        let first: Vec<Vec<f32>> = loader.iter().map(|b| first_column(&b)).collect();
        let second: Vec<Vec<f32>> = loader.iter().map(|b| first_column(&b)).collect();
        assert_eq!(first, second);
        assert_eq!(loader.epochs_started(), 2);
    }

    #[test]
    fn test_shuffle_changes_between_epochs() {
        let loader = DataLoader::new(dataset(32), 4).with_shuffle(true).with_seed(7);
        assert_ne!(loader.epoch_order(0), loader.epoch_order(1));
        // Reproducible for a given seed
        assert_eq!(loader.epoch_order(3), loader.clone().epoch_order(3));
    }

    #[test]
    fn test_zero_batch_size_is_one() {
        let loader = DataLoader::new(dataset(3), 0);
        assert_eq!(loader.batch_size(), 1);
        assert_eq!(loader.len(), 3);
    }

    proptest! {
        #[test]
        fn prop_epoch_covers_every_row_once(
            n in 1usize..60,
            batch_size in 1usize..16,
            seed in any::<u64>(),
        ) {
            let mut loader = DataLoader::new(dataset(n), batch_size)
                .with_shuffle(true)
                .with_seed(seed);

            let batches: Vec<Batch> = loader.iter().collect();
            prop_assert_eq!(batches.len(), n.div_ceil(batch_size));

            let mut seen: Vec<usize> = batches
                .iter()
                .flat_map(first_column)
                .map(|v| v as usize)
                .collect();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..n).collect::<Vec<_>>());
        }

        #[test]
        fn prop_labels_stay_aligned(n in 1usize..40, batch_size in 1usize..8) {
            let mut loader = DataLoader::new(dataset(n), batch_size).with_shuffle(true);
            for batch in loader.iter() {
                for (row, label) in first_column(&batch).iter().zip(batch.targets.data().iter()) {
                    prop_assert_eq!((*row as usize % 2) as f32, *label);
                }
            }
        }
    }
}
