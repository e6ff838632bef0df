// ============================================================
// Layer 4 — Volume Batcher
// ============================================================
// Implements Burn's Batcher trait to stack VolumeItems into
// device tensors.
//
// How batching works here:
//   Input:  Vec of N items, volumes [C, X, Y, Z], labels [X, Y, Z]
//   Output: VolumeBatch with volumes [N, C, X, Y, Z]
//                            labels  [N, X, Y, Z]
//
//   Every item's buffer is already row-major, so stacking is a
//   concatenation of the flat buffers in item order:
//   [item0 | item1 | ... | itemN-1] → reshape to [N, ...]
//
// All items must share one shape. In training this holds because
// every sample is cropped to the same sample shape; in eval mode
// volumes keep their native extent, so batch size 1 is used.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::{dataset::VolumeItem, DataError, DataResult};

// ─── VolumeBatch ──────────────────────────────────────────────────────────────
/// A batch of samples ready for the model forward pass.
#[derive(Debug, Clone)]
pub struct VolumeBatch<B: Backend> {
    /// MRI intensities, shape [N, C, X, Y, Z]
    pub volumes: Tensor<B, 5>,

    /// Class index per voxel, shape [N, X, Y, Z]
    pub labels: Tensor<B, 4, Int>,
}

/// Stack `items` into one batch on `device`, preserving order.
pub fn collate<B: Backend>(items: Vec<VolumeItem>, device: &B::Device) -> DataResult<VolumeBatch<B>> {
    let first = items.first().ok_or(DataError::EmptyBatch)?;
    let volume_shape = first.volume.shape();
    let label_shape  = first.label.shape();

    for (index, item) in items.iter().enumerate() {
        if item.volume.shape() != volume_shape {
            return Err(DataError::ShapeMismatch {
                index,
                expected: volume_shape.to_vec(),
                found:    item.volume.shape().to_vec(),
            });
        }
        if item.label.shape() != label_shape {
            return Err(DataError::ShapeMismatch {
                index,
                expected: label_shape.to_vec(),
                found:    item.label.shape().to_vec(),
            });
        }
    }

    let n = items.len();
    let [c, x, y, z] = volume_shape;

    // ── Flatten in item order ─────────────────────────────────────────────────
    let mut volume_flat = Vec::with_capacity(n * c * x * y * z);
    let mut label_flat  = Vec::with_capacity(n * x * y * z);
    for item in items {
        volume_flat.extend(item.volume.into_data());
        label_flat.extend(item.label.into_data().into_iter().map(i64::from));
    }

    // ── Create tensors ────────────────────────────────────────────────────────
    let volumes = Tensor::<B, 5>::from_data(
        TensorData::new(volume_flat, [n, c, x, y, z]).convert::<B::FloatElem>(),
        device,
    );
    let labels = Tensor::<B, 4, Int>::from_data(
        TensorData::new(label_flat, [n, x, y, z]).convert::<B::IntElem>(),
        device,
    );

    Ok(VolumeBatch { volumes, labels })
}

// ─── VolumeBatcher ────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created on the correct GPU/CPU.
#[derive(Clone, Debug)]
pub struct VolumeBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> VolumeBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

// ─── Burn Batcher Trait Implementation ────────────────────────────────────────
// The DataLoader calls .batch(items) from its worker threads and
// has no error channel, so a collation failure aborts the run.
impl<B: Backend> Batcher<VolumeItem, VolumeBatch<B>> for VolumeBatcher<B> {
    fn batch(&self, items: Vec<VolumeItem>) -> VolumeBatch<B> {
        match collate(items, &self.device) {
            Ok(batch) => batch,
            Err(e) => panic!("Batch collation failed: {e}"),
        }
    }
}
