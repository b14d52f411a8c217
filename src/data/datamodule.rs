//! Train/validation/test split orchestration

use super::{ChurnDataset, DataLoader};
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Lifecycle stage a data module is set up for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Training plus validation
    Fit,
    Test,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Fit => "fit",
            Stage::Test => "test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fit" => Ok(Stage::Fit),
            "test" => Ok(Stage::Test),
            other => Err(Error::UnknownStage(other.to_string())),
        }
    }
}

/// The three pre-built splits
#[derive(Clone, Debug)]
pub struct SplitBundle {
    pub train: Arc<ChurnDataset>,
    pub valid: Arc<ChurnDataset>,
    pub test: Arc<ChurnDataset>,
}

/// Source of per-stage data loaders, as consumed by the trainer
pub trait DataModule {
    fn setup(&mut self, stage: Stage) -> Result<()>;

    /// Shuffled loader over the training split
    fn train_dataloader(&self) -> Result<DataLoader>;

    fn val_dataloader(&self) -> Result<DataLoader>;

    fn test_dataloader(&self) -> Result<DataLoader>;
}

/// Data module over three in-memory churn datasets.
///
/// Splits are assigned once with [`prepare`](Self::prepare); [`setup`] then
/// exposes only the splits belonging to the requested stage.
///
/// [`setup`]: DataModule::setup
#[derive(Debug)]
pub struct ChurnDataModule {
    batch_size: usize,
    seed: u64,
    splits: Option<SplitBundle>,
    train_data: Option<Arc<ChurnDataset>>,
    valid_data: Option<Arc<ChurnDataset>>,
    test_data: Option<Arc<ChurnDataset>>,
}

impl ChurnDataModule {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            seed: 0,
            splits: None,
            train_data: None,
            valid_data: None,
            test_data: None,
        }
    }

    /// Base seed for the training loader's per-epoch shuffle
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Assign the splits. Fails if they were already assigned.
    pub fn prepare(
        &mut self,
        train: ChurnDataset,
        valid: ChurnDataset,
        test: ChurnDataset,
    ) -> Result<()> {
        if self.splits.is_some() {
            return Err(Error::AlreadyPrepared);
        }
        debug!(
            train = train.len(),
            valid = valid.len(),
            test = test.len(),
            "splits prepared"
        );
        self.splits = Some(SplitBundle {
            train: Arc::new(train),
            valid: Arc::new(valid),
            test: Arc::new(test),
        });
        Ok(())
    }

    pub fn splits(&self) -> Option<&SplitBundle> {
        self.splits.as_ref()
    }
}

impl DataModule for ChurnDataModule {
    fn setup(&mut self, stage: Stage) -> Result<()> {
        let splits = self.splits.as_ref().ok_or(Error::NotPrepared)?;
        match stage {
            Stage::Fit => {
                self.train_data = Some(Arc::clone(&splits.train));
                self.valid_data = Some(Arc::clone(&splits.valid));
            }
            Stage::Test => {
                self.test_data = Some(Arc::clone(&splits.test));
            }
        }
        Ok(())
    }

    fn train_dataloader(&self) -> Result<DataLoader> {
        let data = self.train_data.as_ref().ok_or(Error::StageNotActive {
            split: "train",
            stage: "fit",
        })?;
        Ok(DataLoader::new(Arc::clone(data), self.batch_size)
            .with_shuffle(true)
            .with_seed(self.seed))
    }

    fn val_dataloader(&self) -> Result<DataLoader> {
        let data = self.valid_data.as_ref().ok_or(Error::StageNotActive {
            split: "validation",
            stage: "fit",
        })?;
        Ok(DataLoader::new(Arc::clone(data), self.batch_size))
    }

    fn test_dataloader(&self) -> Result<DataLoader> {
        let data = self.test_data.as_ref().ok_or(Error::StageNotActive {
            split: "test",
            stage: "test",
        })?;
        Ok(DataLoader::new(Arc::clone(data), self.batch_size))
    }
}
