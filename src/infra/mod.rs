// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence shared by training and evaluation:
//
//   checkpoint.rs — Saving and loading model weights
//                   Uses Burn's CompactRecorder to serialise
//                   parameters to disk. Also saves/loads the
//                   ExperimentConfig and the training NormStats
//                   as JSON so `evaluate` can rebuild the run.
//
//   metrics.rs    — Training metrics logging
//                   Appends one CSV row per epoch (loss,
//                   augmentation probability, Dice scores).
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
