//! Churn datasets, batching and the split orchestrator

mod batch;
mod datamodule;
mod dataset;
mod loader;

pub use batch::Batch;
pub use datamodule::{ChurnDataModule, DataModule, SplitBundle, Stage};
pub use dataset::{ChurnDataset, Sample};
pub use loader::{Batches, DataLoader};
