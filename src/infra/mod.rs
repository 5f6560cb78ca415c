// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence concerns shared by training and prediction:
//
//   checkpoint.rs — best-model weights (Burn CompactRecorder),
//                   training config and class indices (JSON)
//
//   metrics.rs    — per-epoch loss/accuracy appended to a CSV
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
