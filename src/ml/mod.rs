// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model, optimiser and recorder code lives here.
//
//   model.rs      — the CNN: three conv/pool blocks, a dense
//                   layer with dropout, and a linear class head
//
//   callbacks.rs  — early stopping and best-checkpoint monitors
//
//   trainer.rs    — the epoch loop: forward, loss, backward,
//                   Adam step, validation, callbacks
//
//   inferencer.rs — loads the best checkpoint and classifies
//                   one image
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// CNN image classifier architecture
pub mod model;

/// Early stopping and checkpoint-best monitors
pub mod callbacks;

/// Full training loop with validation and checkpointing
pub mod trainer;

/// Inference engine — loads checkpoint and predicts a label
pub mod inferencer;
