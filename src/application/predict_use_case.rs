// ============================================================
// Layer 2 — Predict Use Case
// ============================================================
// Loads the best checkpoint written by `train` and classifies
// one image file.

use anyhow::Result;
use std::path::{Path, PathBuf};

use crate::domain::image_sample::Prediction;
use crate::domain::traits::ImageClassifier;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::{InferBackend, Inferencer};

pub struct PredictUseCase {
    checkpoint_dir: PathBuf,
    classifier:     Box<dyn ImageClassifier>,
}

impl PredictUseCase {
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Result<Self> {
        let checkpoint_dir = checkpoint_dir.into();
        let ckpt   = CheckpointManager::new(checkpoint_dir.clone());
        let device = burn::backend::wgpu::WgpuDevice::default();

        if let Ok(best) = ckpt.best_epoch() {
            tracing::info!("Using weights from epoch {} (val_loss={:.4})", best.epoch, best.val_loss);
        }
        let inferencer = Inferencer::<InferBackend>::from_checkpoint(&ckpt, device)?;

        Ok(Self::with_classifier(checkpoint_dir, Box::new(inferencer)))
    }

    pub fn with_classifier(checkpoint_dir: PathBuf, classifier: Box<dyn ImageClassifier>) -> Self {
        Self { checkpoint_dir, classifier }
    }

    pub fn predict(&self, image: &Path) -> Result<Prediction> {
        tracing::info!(
            "Classifying '{}' with checkpoint '{}'",
            image.display(),
            self.checkpoint_dir.display()
        );
        self.classifier.classify(image)
    }
}
