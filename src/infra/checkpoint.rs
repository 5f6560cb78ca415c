// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything prediction needs to rebuild
// the trained classifier.
//
// Files in the checkpoint directory:
//   best_model.mpk.gz   ← weights with the lowest val_loss so far
//   best_epoch.json     ← {"epoch": 4, "val_loss": 0.53}
//   train_config.json   ← image size, hidden units, etc.
//   class_indices.json  ← {"cover_drive": 0, "pull_shot": 1, ...}
//   metrics.csv         ← written by MetricsLogger
//
// Weights go through Burn's CompactRecorder (MessagePack +
// gzip, half precision). Loading fails if the architecture
// rebuilt from train_config.json doesn't match the weights.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::class_index::ClassIndex;
use crate::ml::model::CnnClassifier;

const MODEL_FILE:   &str = "best_model";
/// MODEL_FILE plus the extension CompactRecorder appends
const MODEL_PATH:   &str = "best_model.mpk.gz";
const EPOCH_FILE:   &str = "best_epoch.json";
const CONFIG_FILE:  &str = "train_config.json";
const CLASSES_FILE: &str = "class_indices.json";

/// Metadata written alongside the best weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestEpoch {
    pub epoch:    usize,
    pub val_loss: f64,
}

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a new CheckpointManager.
    /// The directory is only created once something is saved into it.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best-model weights and record which epoch they came from.
    pub fn save_best<B: Backend>(
        &self,
        model:    &CnnClassifier<B>,
        epoch:    usize,
        val_loss: f64,
    ) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(MODEL_FILE);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_json(EPOCH_FILE, &BestEpoch { epoch, val_loss })?;

        tracing::debug!("Saved best model: epoch {} (val_loss={:.4})", epoch, val_loss);
        Ok(())
    }

    /// Load the best weights into a freshly initialised model of the
    /// same architecture.
    pub fn load_model<B: Backend>(
        &self,
        model:  CnnClassifier<B>,
        device: &B::Device,
    ) -> Result<CnnClassifier<B>> {
        let path = self.dir.join(MODEL_FILE);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!(
                    "Cannot load checkpoint '{}'. Have you trained the model first?",
                    path.display()
                )
            })?;

        Ok(model.load_record(record))
    }

    /// Delete the best weights and their epoch record left by an
    /// earlier run, so they can never sit next to a newer config.
    pub fn clear_best(&self) -> Result<()> {
        for name in [MODEL_PATH, EPOCH_FILE] {
            let path = self.dir.join(name);
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove stale '{}'", path.display()))?;
                tracing::debug!("Removed stale '{}'", path.display());
            }
        }
        Ok(())
    }

    pub fn best_epoch(&self) -> Result<BestEpoch> {
        self.read_json(EPOCH_FILE)
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_class_index(&self, index: &ClassIndex) -> Result<()> {
        self.write_json(CLASSES_FILE, index)
    }

    pub fn load_class_index(&self) -> Result<ClassIndex> {
        self.read_json(CLASSES_FILE)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", self.dir.display()))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Make sure you have run 'train' before 'predict'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))
    }
}
