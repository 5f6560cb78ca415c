// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam,
// with two callbacks watching val_loss after every epoch:
//
//   BestCheckpoint → write best_model.mpk.gz on improvement
//   EarlyStopping  → stop after `patience` flat epochs, then
//                    roll the in-memory weights back to the best
//
// Backend notes:
//   - Training runs on Autodiff<Wgpu> for gradients
//   - model.valid() gives the same weights on plain Wgpu, with
//     dropout disabled, so validation batches use the inner backend
//   - The loop itself is generic over AutodiffBackend so it can
//     run on NdArray in tests
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{ImageBatch, ImageBatcher},
    dataset::ImageDataset,
    preprocessor::Preprocessor,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::callbacks::{BestCheckpoint, EarlyStopping, Verdict};
use crate::ml::model::{count_correct, CnnClassifier};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// Per-epoch metrics plus how the run ended
#[derive(Debug, Clone, Default)]
pub struct History {
    pub epochs:        Vec<EpochMetrics>,
    /// Epoch whose weights were kept (lowest val_loss)
    pub best_epoch:    Option<usize>,
    /// Set when early stopping cut the run short
    pub stopped_epoch: Option<usize>,
}

pub struct TrainingOutcome<B: AutodiffBackend> {
    pub model:   CnnClassifier<B>,
    pub history: History,
}

/// Sample-weighted running mean of loss and accuracy over one pass
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStats {
    loss_sum: f64,
    correct:  usize,
    seen:     usize,
}

impl RunningStats {
    /// `batch_loss` is the mean loss of a batch of `batch_size` samples
    pub fn update(&mut self, batch_loss: f64, correct: usize, batch_size: usize) {
        self.loss_sum += batch_loss * batch_size as f64;
        self.correct  += correct;
        self.seen     += batch_size;
    }

    pub fn mean_loss(&self) -> f64 {
        if self.seen > 0 { self.loss_sum / self.seen as f64 } else { f64::NAN }
    }

    pub fn accuracy(&self) -> f64 {
        if self.seen > 0 { self.correct as f64 / self.seen as f64 } else { 0.0 }
    }
}

/// Train on a WGPU device. The returned model carries the restored
/// best weights; the same weights are also on disk in the checkpoint
/// directory.
pub fn run_training(
    cfg:           &TrainConfig,
    num_classes:   usize,
    train_dataset: ImageDataset,
    val_dataset:   ImageDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        burn::backend::wgpu::WgpuDevice,
) -> Result<TrainingOutcome<TrainBackend>> {
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<TrainBackend>(
        cfg, num_classes, train_dataset, val_dataset, ckpt_manager, metrics, device,
    )
}

pub fn train_loop<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    num_classes:   usize,
    train_dataset: ImageDataset,
    val_dataset:   ImageDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingOutcome<B>> {
    if train_dataset.sample_count() == 0 {
        bail!("training subset is empty; add images to the class folders");
    }
    if val_dataset.sample_count() == 0 {
        bail!(
            "validation subset is empty; early stopping and checkpointing monitor val_loss \
             (raise --validation-split or add images)"
        );
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let model_cfg = cfg.model_config(num_classes);
    let mut model: CnnClassifier<B> = model_cfg.init(&device)?;
    tracing::info!("Model ready: {} parameters", model.num_params());

    // Keras defaults: lr=1e-3, β1=0.9, β2=0.999, ε=1e-7
    let mut optim = AdamConfig::new().with_epsilon(1e-7).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let preprocessor = Preprocessor::new(cfg.img_height, cfg.img_width);
    let train_aug    = cfg.augmenter();
    let val_aug      = if cfg.augment_validation { train_aug.clone() } else { None };

    let train_batcher = ImageBatcher::<B>::new(device.clone(), preprocessor, train_aug);
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(train_dataset);

    let val_batcher = ImageBatcher::<B::InnerBackend>::new(device.clone(), preprocessor, val_aug);
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(cfg.num_workers)
        .build(val_dataset);

    // ── Callbacks ─────────────────────────────────────────────────────────────
    let mut checkpoint = BestCheckpoint::new();
    let mut early_stop = EarlyStopping::new(cfg.patience);
    let mut best_model: Option<CnnClassifier<B>> = None;
    let mut history    = History::default();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut train = RunningStats::default();

        for batch in train_loader.iter() {
            let n = batch.targets.dims()[0];
            let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train.update(loss_val, count_correct(logits, batch.targets), n);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        let val = evaluate(&model.valid(), val_loader.iter());

        let m = EpochMetrics::new(
            epoch,
            train.mean_loss(),
            train.accuracy(),
            val.mean_loss(),
            val.accuracy(),
        );
        println!(
            "Epoch {:>3}/{} | loss={:.4} | accuracy={:.4} | val_loss={:.4} | val_accuracy={:.4}",
            epoch, cfg.epochs, m.train_loss, m.train_acc, m.val_loss, m.val_acc,
        );
        metrics.log(&m)?;
        history.epochs.push(m.clone());

        if checkpoint.observe(epoch, m.val_loss) {
            ckpt_manager.save_best(&model, epoch, m.val_loss)?;
            tracing::info!("val_loss improved to {:.4}, saved best model", m.val_loss);
        }

        match early_stop.observe(epoch, m.val_loss) {
            Verdict::Improved => best_model = Some(model.clone()),
            Verdict::Waiting  => tracing::info!(
                "val_loss did not improve ({}/{} epochs of patience used)",
                early_stop.wait(), cfg.patience,
            ),
            Verdict::Stop     => {
                tracing::info!(
                    "Early stopping at epoch {}: no val_loss improvement for {} epochs",
                    epoch, cfg.patience,
                );
                break;
            }
        }
    }

    if let Some(best) = best_model {
        if let Some(e) = early_stop.best_epoch() {
            tracing::info!("Restoring model weights from the end of the best epoch: {}", e);
        }
        model = best;
    }

    if let Some((e, loss)) = checkpoint.best() {
        tracing::info!("Best checkpoint: epoch {} (val_loss={:.4})", e, loss);
    }

    history.best_epoch    = early_stop.best_epoch();
    history.stopped_epoch = early_stop.stopped_epoch();

    tracing::info!("Training complete!");
    Ok(TrainingOutcome { model, history })
}

/// Mean loss and accuracy of `model` over a stream of batches.
pub fn evaluate<B, I>(model: &CnnClassifier<B>, batches: I) -> RunningStats
where
    B: Backend,
    I: IntoIterator<Item = ImageBatch<B>>,
{
    let mut stats = RunningStats::default();
    for batch in batches {
        let n = batch.targets.dims()[0];
        let (loss, logits) = model.forward_loss(batch.images, batch.targets.clone());
        stats.update(loss.into_scalar().elem::<f64>(), count_correct(logits, batch.targets), n);
    }
    stats
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::augment::AugmentConfig;
    use crate::domain::image_sample::ImageSample;
    use burn::backend::{Autodiff, NdArray};
    use image::{Rgb, RgbImage};
    use std::path::Path;

    type TestBackend = Autodiff<NdArray>;

    fn write_solid(dir: &Path, name: &str, colour: [u8; 3]) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(22, 22, Rgb(colour)).save(&path).unwrap();
        path
    }

    #[test]
    fn test_running_stats_weights_by_batch_size() {
        let mut s = RunningStats::default();
        s.update(1.0, 2, 2);
        s.update(4.0, 0, 1);
        assert!((s.mean_loss() - 2.0).abs() < 1e-12);
        assert!((s.accuracy() - 2.0 / 3.0).abs() < 1e-12);
        assert!(RunningStats::default().mean_loss().is_nan());
    }

    #[test]
    fn test_tiny_training_run_writes_best_checkpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let mut train = Vec::new();
        let mut val   = Vec::new();
        for i in 0..3 {
            train.push(ImageSample::new(write_solid(tmp.path(), &format!("r{i}.png"), [255, 0, 0]), 0));
            train.push(ImageSample::new(write_solid(tmp.path(), &format!("b{i}.png"), [0, 0, 255]), 1));
        }
        val.push(ImageSample::new(write_solid(tmp.path(), "rv.png", [250, 5, 5]), 0));
        val.push(ImageSample::new(write_solid(tmp.path(), "bv.png", [5, 5, 250]), 1));

        let ckpt_dir = tmp.path().join("ckpt");
        let cfg = TrainConfig {
            checkpoint_dir: ckpt_dir.clone(),
            img_height:     22,
            img_width:      22,
            batch_size:     2,
            epochs:         2,
            hidden_units:   8,
            augment:        AugmentConfig::disabled(),
            ..TrainConfig::default()
        };

        let ckpt    = CheckpointManager::new(&ckpt_dir);
        let metrics = MetricsLogger::new(&ckpt_dir).unwrap();
        let outcome = train_loop::<TestBackend>(
            &cfg,
            2,
            ImageDataset::new(train),
            ImageDataset::new(val),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap();

        let h = &outcome.history;
        assert!(!h.epochs.is_empty() && h.epochs.len() <= 2);
        assert_eq!(h.best_epoch, Some(ckpt.best_epoch().unwrap().epoch));
        assert!(ckpt_dir.join("best_model.mpk.gz").exists());

        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().count(), 1 + h.epochs.len());
    }

    #[test]
    fn test_plateau_stops_early_and_restores_best_weights() {
        let tmp = tempfile::tempdir().unwrap();
        let mut train = Vec::new();
        for i in 0..2 {
            train.push(ImageSample::new(write_solid(tmp.path(), &format!("r{i}.png"), [255, 0, 0]), 0));
            train.push(ImageSample::new(write_solid(tmp.path(), &format!("b{i}.png"), [0, 0, 255]), 1));
        }
        let val = vec![
            ImageSample::new(write_solid(tmp.path(), "rv.png", [250, 5, 5]), 0),
            ImageSample::new(write_solid(tmp.path(), "bv.png", [5, 5, 250]), 1),
        ];

        // A zero step size freezes the weights, so every epoch after the
        // first reports exactly the same val_loss and never improves.
        let ckpt_dir = tmp.path().join("ckpt");
        let cfg = TrainConfig {
            checkpoint_dir: ckpt_dir.clone(),
            img_height:     22,
            img_width:      22,
            batch_size:     2,
            epochs:         6,
            learning_rate:  0.0,
            hidden_units:   8,
            patience:       1,
            augment:        AugmentConfig::disabled(),
            ..TrainConfig::default()
        };

        let ckpt    = CheckpointManager::new(&ckpt_dir);
        let metrics = MetricsLogger::new(&ckpt_dir).unwrap();
        let outcome = train_loop::<TestBackend>(
            &cfg,
            2,
            ImageDataset::new(train),
            ImageDataset::new(val),
            &ckpt,
            &metrics,
            Default::default(),
        )
        .unwrap();

        let h = &outcome.history;
        assert_eq!(h.stopped_epoch, Some(2));
        assert_eq!(h.best_epoch, Some(1));
        assert!(h.epochs.len() < cfg.epochs);
        assert_eq!(h.epochs[0].val_loss, h.epochs[1].val_loss);

        // The in-memory model must match the weights saved for the best epoch
        let device   = Default::default();
        let restored = outcome.model.valid();
        let fresh    = cfg.model_config(2).init::<NdArray>(&device).unwrap();
        let on_disk  = ckpt.load_model(fresh, &device).unwrap();

        let x = Tensor::<NdArray, 4>::ones([1, 3, 22, 22], &device);
        let a: Vec<f32> = restored.forward(x.clone()).into_data().convert::<f32>().to_vec().unwrap();
        let b: Vec<f32> = on_disk.forward(x).into_data().convert::<f32>().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-2, "{x} vs {y}");
        }
    }

    #[test]
    fn test_empty_validation_subset_is_rejected() {
        let tmp  = tempfile::tempdir().unwrap();
        let cfg  = TrainConfig { checkpoint_dir: tmp.path().to_path_buf(), ..TrainConfig::default() };
        let ckpt = CheckpointManager::new(tmp.path());
        let log  = MetricsLogger::new(tmp.path()).unwrap();

        let train = ImageDataset::new(vec![ImageSample::new("x.png", 0)]);
        let res = train_loop::<TestBackend>(
            &cfg, 2, train, ImageDataset::new(Vec::new()), &ckpt, &log, Default::default(),
        );
        assert!(res.is_err());
    }
}
