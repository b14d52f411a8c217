//! Mini-batch container

use crate::error::{Error, Result};
use crate::Tensor;

/// A group of aligned samples.
///
/// `inputs` holds `rows × cols` features in row-major order, `targets` one label
/// per row.
#[derive(Clone, Debug)]
pub struct Batch {
    pub inputs: Tensor,
    pub targets: Tensor,
    pub rows: usize,
    pub cols: usize,
}

impl Batch {
    pub fn new(inputs: Tensor, targets: Tensor, rows: usize, cols: usize) -> Result<Self> {
        if inputs.len() != rows * cols {
            return Err(Error::ShapeMismatch {
                expected: vec![rows, cols],
                got: vec![inputs.len()],
            });
        }
        if targets.len() != rows {
            return Err(Error::ShapeMismatch {
                expected: vec![rows],
                got: vec![targets.len()],
            });
        }
        Ok(Self {
            inputs,
            targets,
            rows,
            cols,
        })
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
