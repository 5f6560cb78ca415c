// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Scan the dataset folders     (Layer 4 - data)
//   Step 2: Check the class layout       (Layer 3 - domain)
//   Step 3: Split train/validation       (Layer 4 - data)
//   Step 4: Summarise the model          (Layer 5 - ml)
//   Step 5: Save config + class indices  (Layer 6 - infra)
//   Step 6: Run training loop            (Layer 5 - ml)
//
// The run hands back a classifier built from the restored best
// weights, so `train --image` needs no reload from disk.
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::module::AutodiffModule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{
    augment::{AugmentConfig, ImageAugmenter},
    dataset::ImageDataset,
    loader::ImageFolderLoader,
    preprocessor::Preprocessor,
    splitter::{num_batches, split_train_val},
};
use crate::domain::traits::ImageSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::inferencer::{InferBackend, Inferencer};
use crate::ml::model::CnnClassifierConfig;
use crate::ml::trainer::{run_training, History};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters and paths for a training run.
// Saved as train_config.json so prediction can rebuild the
// exact same architecture and input size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub dataset_dir:        PathBuf,
    pub checkpoint_dir:     PathBuf,
    pub img_height:         usize,
    pub img_width:          usize,
    pub batch_size:         usize,
    pub epochs:             usize,
    pub learning_rate:      f64,
    pub validation_split:   f64,
    pub hidden_units:       usize,
    pub dropout:            f64,
    pub patience:           usize,
    pub num_workers:        usize,
    pub seed:               u64,
    /// Expected number of class folders; None accepts whatever is found
    pub num_classes:        Option<usize>,
    pub augment:            AugmentConfig,
    pub augment_validation: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            dataset_dir:        PathBuf::from("dataset"),
            checkpoint_dir:     PathBuf::from("checkpoints"),
            img_height:         224,
            img_width:          224,
            batch_size:         32,
            epochs:             10,
            learning_rate:      1e-3,
            validation_split:   0.2,
            hidden_units:       512,
            dropout:            0.5,
            patience:           5,
            num_workers:        1,
            seed:               42,
            num_classes:        None,
            augment:            AugmentConfig::default(),
            augment_validation: true,
        }
    }
}

impl TrainConfig {
    pub fn model_config(&self, num_classes: usize) -> CnnClassifierConfig {
        CnnClassifierConfig::new(num_classes, self.img_height, self.img_width)
            .with_hidden_units(self.hidden_units)
            .with_dropout(self.dropout)
    }

    /// None when every augmentation range is zero
    pub fn augmenter(&self) -> Option<ImageAugmenter> {
        (!self.augment.is_disabled()).then(|| ImageAugmenter::new(self.augment.clone()))
    }

    /// Reject settings that would fail or silently misbehave mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        if self.epochs == 0 {
            bail!("epochs must be positive");
        }
        if !(self.learning_rate > 0.0) {
            bail!("learning rate must be positive, got {}", self.learning_rate);
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            bail!("validation_split must be in [0, 1), got {}", self.validation_split);
        }
        let a = &self.augment;
        for (name, v) in [
            ("rotation_range",     a.rotation_range),
            ("width_shift_range",  a.width_shift_range),
            ("height_shift_range", a.height_shift_range),
            ("shear_range",        a.shear_range),
        ] {
            if !(v >= 0.0) {
                bail!("{name} must be non-negative, got {v}");
            }
        }
        if !(0.0..1.0).contains(&a.zoom_range) {
            bail!("zoom_range must be in [0, 1), got {}", a.zoom_range);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
/// Result of a finished run
pub struct TrainReport {
    pub history:    History,
    /// Holds the best weights restored at the end of training
    pub classifier: Inferencer<InferBackend>,
}

pub struct TrainUseCase<S: ImageSource = ImageFolderLoader> {
    config: TrainConfig,
    source: S,
}

impl TrainUseCase {
    /// Train on the class folders under `config.dataset_dir`
    pub fn new(config: TrainConfig) -> Self {
        let source = ImageFolderLoader::new(config.dataset_dir.clone());
        Self { config, source }
    }
}

impl<S: ImageSource> TrainUseCase<S> {
    pub fn with_source(config: TrainConfig, source: S) -> Self {
        Self { config, source }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainReport> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1: Scan class folders ────────────────────────────────────────
        tracing::info!("Scanning dataset in '{}'", cfg.dataset_dir.display());
        let folder = self.source.scan()?;
        tracing::info!(
            "Found {} images in {} class folders",
            folder.num_images(),
            folder.num_classes()
        );

        // ── Step 2: Check the class layout ────────────────────────────────────
        let num_classes = folder.num_classes();
        if let Some(expected) = cfg.num_classes {
            if expected != num_classes {
                bail!(
                    "expected {} classes but found {} class folders: {:?}",
                    expected,
                    num_classes,
                    folder.class_index.names()
                );
            }
        }
        if num_classes < 2 {
            bail!(
                "need at least 2 class folders under '{}', found {}",
                cfg.dataset_dir.display(),
                num_classes
            );
        }
        tracing::info!("Classes: {:?}", folder.class_index.names());

        // ── Step 3: Train / validation split ──────────────────────────────────
        let (train_samples, val_samples) = split_train_val(&folder, cfg.validation_split)?;
        println!("Training batches per epoch:   {}", num_batches(train_samples.len(), cfg.batch_size));
        println!("Validation batches per epoch: {}", num_batches(val_samples.len(), cfg.batch_size));

        let train_dataset = ImageDataset::new(train_samples);
        let val_dataset   = ImageDataset::new(val_samples);
        tracing::debug!("Training class counts: {:?}", train_dataset.class_counts(num_classes));

        // ── Step 4: Model summary ─────────────────────────────────────────────
        let summary = cfg.model_config(num_classes).summary()?;
        println!("{summary}");

        // ── Step 5: Save config for inference ─────────────────────────────────
        let ckpt_manager = CheckpointManager::new(cfg.checkpoint_dir.clone());
        ckpt_manager.clear_best()?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_class_index(&folder.class_index)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        let device  = burn::backend::wgpu::WgpuDevice::default();
        let outcome = run_training(
            cfg, num_classes, train_dataset, val_dataset, &ckpt_manager, &metrics, device.clone(),
        )?;

        if let Some(e) = outcome.history.stopped_epoch {
            tracing::info!("Stopped early at epoch {}", e);
        }

        let classifier = Inferencer::new(
            outcome.model.valid(),
            folder.class_index,
            Preprocessor::new(cfg.img_height, cfg.img_width),
            device,
        );
        Ok(TrainReport { history: outcome.history, classifier })
    }
}
