// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean cross-entropy over the training batches
//   - train_acc:  fraction of training images classified correctly
//   - val_loss:   mean cross-entropy over the validation batches
//   - val_acc:    fraction of validation images classified correctly
//
// Output file: checkpoints/metrics.csv
//
//   epoch,train_loss,train_acc,val_loss,val_acc
//   1,1.352100,0.331000,1.298700,0.402000
//   2,1.101400,0.514000,1.087300,0.559000
//   ...
//
// Each training run rewrites the file, so epoch numbers in it
// always belong to a single run.
//
// If val_loss climbs while train_loss keeps falling, the model
// is overfitting; early stopping will cut the run short.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,train_acc,val_loss,val_acc";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    pub train_loss: f64,
    pub train_acc:  f64,
    pub val_loss:   f64,
    pub val_acc:    f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, train_acc: f64, val_loss: f64, val_acc: f64) -> Self {
        Self { epoch, train_loss, train_acc, val_loss, val_acc }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv for a new training run.
    /// Rows left by an earlier run in the same directory are discarded.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Started metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            m.val_loss,
            m.val_acc,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_header_and_appends_rows() {
        let tmp = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(tmp.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 1.0, 0.25, 0.9, 0.5)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.8, 0.5, 0.7, 0.75)).unwrap();

        let text  = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [
            HEADER,
            "1,1.000000,0.250000,0.900000,0.500000",
            "2,0.800000,0.500000,0.700000,0.750000",
        ]);
    }

    #[test]
    fn test_new_run_starts_a_fresh_file() {
        let tmp = tempfile::tempdir().unwrap();

        let first = MetricsLogger::new(tmp.path()).unwrap();
        first.log(&EpochMetrics::new(1, 1.0, 0.25, 0.9, 0.5)).unwrap();
        first.log(&EpochMetrics::new(2, 0.8, 0.5, 0.7, 0.75)).unwrap();

        let second = MetricsLogger::new(tmp.path()).unwrap();
        second.log(&EpochMetrics::new(1, 1.2, 0.0, 1.1, 0.0)).unwrap();

        let text  = fs::read_to_string(second.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [HEADER, "1,1.200000,0.000000,1.100000,0.000000"]);
    }
}
