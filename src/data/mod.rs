// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from a folder of images to tensor batches.
//
//   dataset/<class>/*.jpg
//       │
//       ▼
//   ImageFolderLoader   → sorted class folders + image paths
//       │
//       ▼
//   splitter            → per-class validation split
//       │
//       ▼
//   ImageDataset        → implements Burn's Dataset trait
//       │
//       ▼
//   ImageBatcher        → decode, resize, rescale, augment, stack
//       │                 (Preprocessor + ImageAugmenter)
//       ▼
//   DataLoader          → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Scans a dataset root with one sub-directory per class
pub mod loader;

/// Deterministic per-class train/validation split
pub mod splitter;

/// Decode, resize and rescale single images
pub mod preprocessor;

/// Random affine augmentation
pub mod augment;

/// Implements Burn's Dataset trait for image samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
