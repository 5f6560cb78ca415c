// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train`   — trains the CNN, optionally classifies --image
//   2. `predict` — loads the best checkpoint and classifies --image

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use crate::application::predict_use_case::PredictUseCase;
use commands::{Commands, PredictArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "shot-classifier",
    version,
    about = "Train a CNN on a folder-labelled image dataset, then classify an image."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(mut args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let image          = args.image.take();
    let checkpoint_dir = args.checkpoint_dir.clone();

    tracing::info!("Starting training on images in: {}", args.dataset_dir.display());
    let report = TrainUseCase::new(args.into()).execute()?;

    match report.history.best_epoch {
        Some(e) => println!("Training complete. Best model from epoch {} saved.", e),
        None    => println!("Training complete. No epoch improved val_loss; nothing saved."),
    }

    // Classify with the restored weights still in memory
    if let Some(image) = image {
        let use_case = PredictUseCase::with_classifier(checkpoint_dir, Box::new(report.classifier));
        classify_and_print(&use_case, &image)?;
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let use_case = PredictUseCase::new(args.checkpoint_dir)?;
    classify_and_print(&use_case, &args.image)
}

fn classify_and_print(use_case: &PredictUseCase, image: &Path) -> Result<()> {
    let prediction = use_case.predict(image)?;
    tracing::info!("Confidence: {:.4}", prediction.confidence);
    println!("This shot is classified as: {}", prediction.label);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["shot-classifier", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        let def = TrainConfig::default();

        assert_eq!(cfg.img_height, def.img_height);
        assert_eq!(cfg.batch_size, def.batch_size);
        assert_eq!(cfg.patience, def.patience);
        assert_eq!(cfg.learning_rate, def.learning_rate);
        assert_eq!(cfg.augment, def.augment);
        assert_eq!(cfg.augment_validation, def.augment_validation);
    }

    #[test]
    fn test_flags_flow_into_config() {
        let cli = Cli::try_parse_from([
            "shot-classifier", "train",
            "--dataset-dir", "/data/shots",
            "--num-classes", "4",
            "--no-horizontal-flip",
            "--no-augment-validation",
            "--zoom-range", "0.1",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();

        assert_eq!(cfg.dataset_dir, std::path::PathBuf::from("/data/shots"));
        assert_eq!(cfg.num_classes, Some(4));
        assert!(!cfg.augment.horizontal_flip);
        assert!(!cfg.augment_validation);
        assert_eq!(cfg.augment.zoom_range, 0.1);
    }

    #[test]
    fn test_predict_requires_image() {
        assert!(Cli::try_parse_from(["shot-classifier", "predict"]).is_err());
        assert!(Cli::try_parse_from(["shot-classifier", "predict", "--image", "a.jpg"]).is_ok());
    }
}
