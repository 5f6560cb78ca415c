// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
// class labels, labelled image samples, and predictions.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Sorted class-name <-> label mapping (Keras-style class_indices)
pub mod class_index;

// One labelled image on disk, plus the scan result for a dataset root
pub mod image_sample;

// Core abstractions (traits) that other layers implement
pub mod traits;
