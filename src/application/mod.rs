// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
//
//   train_use_case   — scan, split, summarise, train, save
//   predict_use_case — load best checkpoint, classify one image
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// The single-image prediction workflow
pub mod predict_use_case;
