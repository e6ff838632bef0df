// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that runs a network lives here.
//
//   backend.rs    — Backend aliases and device selection
//                   Autodiff<Wgpu> by default, NdArray on request
//
//   model.rs      — The 3-D residual segmentation network
//                   • Conv3d stem with batch norm
//                   • Shape-preserving residual blocks
//                   • 1×1×1 class head
//
//   loss.rs       — Voxel-wise cross-entropy (or focal) loss
//
//   inference.rs  — Chunked inference along the slice axis
//
//   evaluator.rs  — Dice scores per tumour region
//
//   trainer.rs    — The training loop
//                   Forward pass, loss, backward pass, Adam
//                   step, periodic checkpoints and evaluation
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Backend aliases and device selection
pub mod backend;

/// Residual 3-D CNN segmentation model
pub mod model;

/// Segmentation loss functions
pub mod loss;

/// Slab-by-slab inference over full volumes
pub mod inference;

/// Region Dice evaluation
pub mod evaluator;

/// Full training loop with periodic evaluation and checkpointing
pub mod trainer;

#[cfg(test)]
pub(crate) mod testing;
