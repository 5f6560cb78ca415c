// ============================================================
// Layer 3 — Image Sample Domain Types
// ============================================================

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::class_index::ClassIndex;

/// One image file and the label of the folder it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSample {
    pub path:  PathBuf,
    pub label: usize,
}

impl ImageSample {
    pub fn new(path: impl Into<PathBuf>, label: usize) -> Self {
        Self { path: path.into(), label }
    }
}

/// Which half of the validation split a sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subset {
    Training,
    Validation,
}

impl std::fmt::Display for Subset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subset::Training   => write!(f, "training"),
            Subset::Validation => write!(f, "validation"),
        }
    }
}

/// Result of scanning a dataset root: the class mapping plus the
/// sorted image files found under each class folder.
/// `files_by_class[i]` holds the files for label `i`.
#[derive(Debug, Clone)]
pub struct ImageFolder {
    pub class_index:    ClassIndex,
    pub files_by_class: Vec<Vec<PathBuf>>,
}

impl ImageFolder {
    pub fn num_classes(&self) -> usize {
        self.class_index.len()
    }

    pub fn num_images(&self) -> usize {
        self.files_by_class.iter().map(Vec::len).sum()
    }
}

/// Output of classifying one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label:         String,
    pub class_index:   usize,
    /// Softmax probability of the predicted class
    pub confidence:    f32,
    /// Softmax probabilities for every class, indexed by label
    pub probabilities: Vec<f32>,
}
