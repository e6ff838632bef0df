// ============================================================
// Layer 5 — Chunked Inference
// ============================================================
// A full BRATS volume (240×240×155 voxels, 4 channels) does not
// fit through the network in one pass, so it is cut into slabs
// along the axial slice axis Z and each slab is run on its own:
//
//   [C, X, Y, Z]
//     │  slices [0..k) [k..2k) ... [..Z)     (last slab may be short)
//     ▼
//   [1, C, X, Y, k] ──net──► [1, K, X, Y, k]
//     │
//     ▼  concatenate along Z, in slab order
//   [1, K, X, Y, Z]
//
// Slabs see no context across their boundaries, so predictions
// near a cut can differ from a whole-volume pass.
//
// Reference: Burn Book §2 (Tensor slicing and concatenation)

use std::ops::Range;

use anyhow::{ensure, Result};
use burn::prelude::*;

use crate::ml::model::SegmentationNetwork;

/// Slab size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 5;

/// Contiguous slice ranges covering `0..len` in steps of `chunk_size`.
pub fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}

/// Run `net` over `volume` ([C, X, Y, Z]) slab by slab.
/// Returns logits of shape [1, K, X, Y, Z].
pub fn split_and_forward<B, N>(net: &N, volume: Tensor<B, 4>, chunk_size: usize) -> Result<Tensor<B, 5>>
where
    B: Backend,
    N: SegmentationNetwork<B>,
{
    ensure!(chunk_size > 0, "chunk size must be at least 1");
    let [c, x, y, z] = volume.dims();
    ensure!(z > 0, "cannot run inference on a volume with no slices");

    let outputs: Vec<Tensor<B, 5>> = chunk_ranges(z, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(index, slices)| {
            tracing::debug!("chunk {} (slices {}..{})", index, slices.start, slices.end);
            let slab = volume.clone().slice([0..c, 0..x, 0..y, slices]);
            net.forward(slab.unsqueeze::<5>())
        })
        .collect();

    Ok(Tensor::cat(outputs, 4))
}
