// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than the concrete loader and inferencer, so either side can
// be swapped (e.g. a CSV-manifest source instead of folders).
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;
use std::path::Path;

use crate::domain::image_sample::{ImageFolder, Prediction};

// ─── ImageSource ──────────────────────────────────────────────────────────────
/// Any component that can enumerate labelled images.
///
/// Implementations:
///   - ImageFolderLoader → one sub-directory per class
pub trait ImageSource {
    fn scan(&self) -> Result<ImageFolder>;
}

// ─── ImageClassifier ──────────────────────────────────────────────────────────
/// Any component that can assign a class label to an image file.
///
/// Implementations:
///   - Inferencer → the trained CNN loaded from a checkpoint
pub trait ImageClassifier {
    fn classify(&self, path: &Path) -> Result<Prediction>;
}
