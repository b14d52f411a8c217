//! Channels for reporting trial progress to a tuner

use super::Trial;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Receiver of per-epoch and end-of-run objective values
pub trait TuningReporter {
    fn report_intermediate(&mut self, value: f64) -> Result<()>;

    fn report_final(&mut self, value: f64) -> Result<()>;
}

/// Discards every report
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl TuningReporter for NoopReporter {
    fn report_intermediate(&mut self, _value: f64) -> Result<()> {
        Ok(())
    }

    fn report_final(&mut self, _value: f64) -> Result<()> {
        Ok(())
    }
}

/// Records reports into a shared [`Trial`].
///
/// Keep a clone of [`TrialReporter::trial`] to read the outcome after the
/// reporter has been handed to a training module.
#[derive(Debug, Clone)]
pub struct TrialReporter {
    trial: Rc<RefCell<Trial>>,
}

impl TrialReporter {
    pub fn new(trial: Trial) -> Self {
        Self {
            trial: Rc::new(RefCell::new(trial)),
        }
    }

    pub fn trial(&self) -> Rc<RefCell<Trial>> {
        Rc::clone(&self.trial)
    }
}

impl TuningReporter for TrialReporter {
    fn report_intermediate(&mut self, value: f64) -> Result<()> {
        self.trial.borrow_mut().report_intermediate(value);
        Ok(())
    }

    fn report_final(&mut self, value: f64) -> Result<()> {
        self.trial.borrow_mut().complete(value);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Intermediate,
    Final,
}

/// One line of a [`JsonlReporter`] file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLine {
    pub kind: ReportKind,
    /// Zero-based, counted across both kinds
    pub sequence: usize,
    pub value: f64,
}

/// Appends one JSON object per report to a file, flushing after each line
#[derive(Debug)]
pub struct JsonlReporter {
    path: PathBuf,
    file: File,
    sequence: usize,
}

impl JsonlReporter {
    /// Open `path` for appending, creating parent directories
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file,
            sequence: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, kind: ReportKind, value: f64) -> Result<()> {
        let line = ReportLine {
            kind,
            sequence: self.sequence,
            value,
        };
        let json = serde_json::to_string(&line)
            .map_err(|e| Error::Tuning(format!("cannot encode report: {e}")))?;
        writeln!(self.file, "{json}")?;
        self.file.flush()?;
        self.sequence += 1;
        Ok(())
    }
}

impl TuningReporter for JsonlReporter {
    fn report_intermediate(&mut self, value: f64) -> Result<()> {
        self.write(ReportKind::Intermediate, value)
    }

    fn report_final(&mut self, value: f64) -> Result<()> {
        self.write(ReportKind::Final, value)
    }
}

/// Parse a file written by [`JsonlReporter`]
pub fn read_reports(path: impl AsRef<Path>) -> Result<Vec<ReportLine>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let report = serde_json::from_str(&line)
            .map_err(|e| Error::Tuning(format!("malformed report line '{line}': {e}")))?;
        lines.push(report);
    }
    Ok(lines)
}
