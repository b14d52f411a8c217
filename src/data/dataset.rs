//! Sample container over aligned feature/label arrays

use super::Batch;
use crate::error::{Error, Result};
use crate::Tensor;
use ndarray::{Array1, Array2, Axis};

/// One `(features, label)` pair
#[derive(Clone, Debug)]
pub struct Sample {
    pub features: Tensor,
    pub label: f32,
}

/// Read-only dataset of precomputed churn features and 0/1 labels.
///
/// Rows of `features` are samples; `labels` has one entry per row. The arrays are
/// never mutated after construction.
#[derive(Clone, Debug)]
pub struct ChurnDataset {
    features: Array2<f32>,
    labels: Array1<f32>,
}

impl ChurnDataset {
    pub fn new(features: Array2<f32>, labels: Array1<f32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(Error::ShapeMismatch {
                expected: vec![features.nrows()],
                got: vec![labels.len()],
            });
        }
        Ok(Self { features, labels })
    }

    /// Build from per-sample rows; every row must have the same width
    pub fn from_rows(rows: &[Vec<f32>], labels: Vec<f32>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                return Err(Error::ShapeMismatch {
                    expected: vec![width],
                    got: vec![row.len()],
                });
            }
            flat.extend_from_slice(row);
        }

        let features = Array2::from_shape_vec((rows.len(), width), flat).map_err(|_| {
            Error::ShapeMismatch {
                expected: vec![rows.len(), width],
                got: vec![rows.len() * width],
            }
        })?;
        Self::new(features, Array1::from(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn feature_dim(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f32> {
        &self.features
    }

    pub fn labels(&self) -> &Array1<f32> {
        &self.labels
    }

    /// Sample at `idx` as a float feature tensor and a float label
    pub fn get(&self, idx: usize) -> Result<Sample> {
        if idx >= self.len() {
            return Err(Error::IndexOutOfRange {
                index: idx,
                len: self.len(),
            });
        }
        Ok(Sample {
            features: Tensor::new(self.features.row(idx).to_owned(), false),
            label: self.labels[idx],
        })
    }

    /// Gather the given rows into one batch
    pub fn collate(&self, indices: &[usize]) -> Result<Batch> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(Error::IndexOutOfRange {
                index: bad,
                len: self.len(),
            });
        }
        Ok(self.gather(indices))
    }

    /// Collate without bounds checks; callers guarantee valid indices
    pub(crate) fn gather(&self, indices: &[usize]) -> Batch {
        let inputs = self.features.select(Axis(0), indices);
        let targets = self.labels.select(Axis(0), indices);
        let (rows, cols) = inputs.dim();
        Batch {
            inputs: Tensor::new(Array1::from_iter(inputs.iter().copied()), false),
            targets: Tensor::new(targets, false),
            rows,
            cols,
        }
    }

    /// Number of samples per integer class label, indexed by label.
    /// Negative or fractional labels are truncated toward zero.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = Vec::new();
        for &label in self.labels.iter() {
            let class = label.max(0.0) as usize;
            if counts.len() <= class {
                counts.resize(class + 1, 0);
            }
            counts[class] += 1;
        }
        counts
    }
}
