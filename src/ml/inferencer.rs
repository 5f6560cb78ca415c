// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{Context, Result};
use burn::prelude::*;
use image::Rgb32FImage;
use std::path::Path;

use crate::data::preprocessor::{to_chw, Preprocessor};
use crate::domain::class_index::ClassIndex;
use crate::domain::image_sample::Prediction;
use crate::domain::traits::ImageClassifier;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::CnnClassifier;

pub type InferBackend = burn::backend::Wgpu;

pub struct Inferencer<B: Backend = InferBackend> {
    model:        CnnClassifier<B>,
    classes:      ClassIndex,
    preprocessor: Preprocessor,
    device:       B::Device,
}

impl<B: Backend> Inferencer<B> {
    /// Rebuild the architecture from train_config.json and load the best weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg     = ckpt_manager.load_config()?;
        let classes = ckpt_manager.load_class_index()?;
        if classes.is_empty() {
            anyhow::bail!("'{}' lists no classes", ckpt_manager.dir().display());
        }

        // Dropout is inactive on a non-autodiff backend anyway
        let model_cfg = cfg.model_config(classes.len());
        let model     = model_cfg.init::<B>(&device)?;
        let model     = ckpt_manager.load_model(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt_manager.dir().display());

        Ok(Self::new(model, classes, Preprocessor::new(cfg.img_height, cfg.img_width), device))
    }

    pub fn new(model: CnnClassifier<B>, classes: ClassIndex, preprocessor: Preprocessor, device: B::Device) -> Self {
        Self { model, classes, preprocessor, device }
    }

    /// Classify an already decoded, resized and rescaled image.
    pub fn predict_image(&self, img: &Rgb32FImage) -> Result<Prediction> {
        let shape  = [1, 3, self.preprocessor.height(), self.preprocessor.width()];
        let input  = Tensor::<B, 4>::from_data(TensorData::new(to_chw(img), shape), &self.device);

        let probabilities: Vec<f32> = self
            .model
            .predict_proba(input)
            .into_data()
            .convert::<f32>()
            .to_vec()
            .map_err(|e| anyhow::anyhow!("Cannot read model output: {e:?}"))?;

        let class_index = argmax(&probabilities)
            .context("model produced no class scores")?;
        let label = self
            .classes
            .label(class_index)
            .with_context(|| format!("class index {class_index} is out of range"))?
            .to_string();

        tracing::debug!("Predicted '{}' (p={:.4})", label, probabilities[class_index]);

        Ok(Prediction {
            label,
            class_index,
            confidence: probabilities[class_index],
            probabilities,
        })
    }
}

impl<B: Backend> ImageClassifier for Inferencer<B> {
    fn classify(&self, path: &Path) -> Result<Prediction> {
        let img = self.preprocessor.load(path)?;
        self.predict_image(&img)
    }
}

/// Index of the largest value; the first one wins on ties.
/// NaN entries are never selected over a number.
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use burn::backend::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[f32::NAN, 0.3]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_classifies_image_from_saved_checkpoint() {
        let tmp    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(tmp.path());
        let device = Default::default();

        let cfg = TrainConfig {
            checkpoint_dir: tmp.path().to_path_buf(),
            img_height:     24,
            img_width:      24,
            hidden_units:   8,
            ..TrainConfig::default()
        };
        let classes = ClassIndex::from_names(["drive", "pull", "sweep"]);
        let model   = cfg.model_config(classes.len()).init::<TestBackend>(&device).unwrap();

        ckpt.save_config(&cfg).unwrap();
        ckpt.save_class_index(&classes).unwrap();
        ckpt.save_best(&model, 1, 0.5).unwrap();

        let query = tmp.path().join("query.jpg");
        RgbImage::from_pixel(40, 30, Rgb([10, 200, 30])).save(&query).unwrap();

        let inferencer = Inferencer::<TestBackend>::from_checkpoint(&ckpt, device).unwrap();
        let pred = inferencer.classify(&query).unwrap();

        assert_eq!(pred.probabilities.len(), 3);
        assert!((pred.probabilities.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert_eq!(classes.label(pred.class_index), Some(pred.label.as_str()));
        assert_eq!(pred.confidence, pred.probabilities[pred.class_index]);
    }

    #[test]
    fn test_empty_class_index_is_rejected() {
        let tmp  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        ckpt.save_config(&TrainConfig::default()).unwrap();
        ckpt.save_class_index(&ClassIndex::from_names(Vec::<String>::new())).unwrap();

        let res = Inferencer::<TestBackend>::from_checkpoint(&ckpt, Default::default());
        let Err(err) = res else { panic!("empty class index must fail") };
        assert!(err.to_string().contains("no classes"));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(tmp.path());
        assert!(Inferencer::<TestBackend>::from_checkpoint(&ckpt, Default::default()).is_err());
    }
}
