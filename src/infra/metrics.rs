// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:         the epoch index (0, 1, 2, ...)
//   - trans_prob:    augmentation probability used that epoch
//   - batches:       optimiser steps taken
//   - last_loss:     loss of the final batch (what the console prints)
//   - mean_loss:     mean loss over all batches
//   - val_whole, val_core, val_enhancing, fscore:
//                    validation scores, empty on epochs without
//                    evaluation
//
// Output file: <model_dir>/metrics.csv
//
// Example CSV output:
//   epoch,trans_prob,batches,last_loss,mean_loss,val_whole,val_core,val_enhancing,fscore
//   0,0.100000,7,1.482311,1.552094,0.112300,0.054100,0.000000,0.072869
//   1,0.100333,7,1.391120,1.431876,,,,
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::ml::evaluator::RegionScores;

const HEADER: &str = "epoch,trans_prob,batches,last_loss,mean_loss,val_whole,val_core,val_enhancing,fscore";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch:      usize,
    pub trans_prob: f64,
    pub batches:    usize,
    pub last_loss:  f64,
    pub mean_loss:  f64,

    /// Validation scores, on evaluation epochs only
    pub val: Option<RegionScores>,
}

impl EpochMetrics {
    fn csv_row(&self) -> String {
        let scores = match self.val {
            Some(s) => format!("{:.6},{:.6},{:.6},{:.6}", s.whole, s.core, s.enhancing, s.fscore()),
            None => ",,,".to_string(),
        };
        format!(
            "{},{:.6},{},{:.6},{:.6},{}",
            self.epoch, self.trans_prob, self.batches, self.last_loss, self.mean_loss, scores
        )
    }
}

/// Appends epoch metrics to a CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Open `<dir>/metrics.csv`, writing the header if the file is new.
    /// An existing file is appended to, so resumed runs keep one log.
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics directory '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;
        writeln!(f, "{}", m.csv_row())?;

        tracing::debug!("Logged epoch {} metrics: mean_loss={:.4}", m.epoch, m.mean_loss);
        Ok(())
    }
}
