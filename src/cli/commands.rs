// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `predict`, and all
// their configurable flags. Every path that used to be
// hard-wired is a flag with a relative default.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::augment::AugmentConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the classifier on a folder-per-class image dataset
    Train(TrainArgs),

    /// Classify one image using the best saved checkpoint
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset root: one sub-directory per class, images inside
    #[arg(long, default_value = "dataset")]
    pub dataset_dir: PathBuf,

    /// Directory to save the best model, config and metrics
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Optional image to classify once training finishes
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Images are resized to this height before entering the network
    #[arg(long, default_value_t = 224)]
    pub img_height: usize,

    /// Images are resized to this width before entering the network
    #[arg(long, default_value_t = 224)]
    pub img_width: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Upper bound on epochs; early stopping may end sooner
    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Fraction of each class held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub validation_split: f64,

    /// Width of the dense layer after the conv blocks
    #[arg(long, default_value_t = 512)]
    pub hidden_units: usize,

    #[arg(long, default_value_t = 0.5)]
    pub dropout: f64,

    /// Epochs without val_loss improvement before stopping
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Threads decoding images for the data loader
    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    /// Seed for the training-batch shuffle
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fail unless exactly this many class folders are found
    #[arg(long)]
    pub num_classes: Option<usize>,

    /// Max random rotation, degrees
    #[arg(long, default_value_t = 20.0)]
    pub rotation_range: f64,

    /// Max horizontal shift, fraction of width (pixels if >= 1)
    #[arg(long, default_value_t = 0.2)]
    pub width_shift_range: f64,

    /// Max vertical shift, fraction of height (pixels if >= 1)
    #[arg(long, default_value_t = 0.2)]
    pub height_shift_range: f64,

    /// Max shear angle, degrees
    #[arg(long, default_value_t = 0.2)]
    pub shear_range: f64,

    /// Zoom factors are drawn from [1 - z, 1 + z]
    #[arg(long, default_value_t = 0.2)]
    pub zoom_range: f64,

    #[arg(long)]
    pub no_horizontal_flip: bool,

    /// Feed validation images through unaugmented
    #[arg(long)]
    pub no_augment_validation: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            dataset_dir:      a.dataset_dir,
            checkpoint_dir:   a.checkpoint_dir,
            img_height:       a.img_height,
            img_width:        a.img_width,
            batch_size:       a.batch_size,
            epochs:           a.epochs,
            learning_rate:    a.lr,
            validation_split: a.validation_split,
            hidden_units:     a.hidden_units,
            dropout:          a.dropout,
            patience:         a.patience,
            num_workers:      a.num_workers,
            seed:             a.seed,
            num_classes:      a.num_classes,
            augment: AugmentConfig {
                rotation_range:     a.rotation_range,
                width_shift_range:  a.width_shift_range,
                height_shift_range: a.height_shift_range,
                shear_range:        a.shear_range,
                zoom_range:         a.zoom_range,
                horizontal_flip:    !a.no_horizontal_flip,
            },
            augment_validation: !a.no_augment_validation,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Image file to classify
    #[arg(long)]
    pub image: PathBuf,

    /// Directory where `train` saved its checkpoint
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,
}
