// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one goal (training, or scoring a saved checkpoint).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - No direct tensor or file-format work (Layers 4 to 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// The training workflow and its configuration
pub mod train_use_case;

// Stand-alone evaluation of a saved checkpoint
pub mod evaluate_use_case;
