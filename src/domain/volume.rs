// ============================================================
// Layer 3 — Volume Domain Types
// ============================================================
// A BRATS subject is four co-registered MRI modalities plus
// one label volume annotated by experts:
//
//   Volume      [C, X, Y, Z]  f32, C = flair, t1, t1ce, t2
//   LabelVolume    [X, Y, Z]  u8, classes {0, 1, 2, 4}
//
// Both are stored row-major in a flat Vec; the last axis (Z,
// the axial slice axis) varies fastest.
//
// NormStats holds per-modality mean and scale computed over
// brain voxels (non-zero intensity) of the training subjects.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MRI modalities in channel order.
pub const MODALITIES: [&str; 4] = ["flair", "t1", "t1ce", "t2"];

/// Number of input channels of a Volume.
pub const NUM_MODALITIES: usize = MODALITIES.len();

/// A flat buffer whose length does not match the declared shape,
/// or two volumes whose spatial extents disagree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("buffer of {len} elements does not match shape {shape:?}")]
    Length { shape: Vec<usize>, len: usize },
    #[error("volume extent {volume:?} does not match label extent {label:?}")]
    Extent { volume: [usize; 3], label: [usize; 3] },
}

// ─── Volume ──────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    shape: [usize; 4],
    data:  Vec<f32>,
}

impl Volume {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, ShapeError> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(ShapeError::Length { shape: shape.to_vec(), len: data.len() });
        }
        Ok(Self { shape, data })
    }

    /// Stack single-channel volumes of identical extent into one volume.
    pub fn from_channels(extent: [usize; 3], channels: Vec<Vec<f32>>) -> Result<Self, ShapeError> {
        let voxels = extent.iter().product::<usize>();
        let shape  = [channels.len(), extent[0], extent[1], extent[2]];
        let mut data = Vec::with_capacity(voxels * channels.len());
        for channel in channels {
            if channel.len() != voxels {
                return Err(ShapeError::Length { shape: extent.to_vec(), len: channel.len() });
            }
            data.extend(channel);
        }
        Self::new(shape, data)
    }

    pub fn shape(&self) -> [usize; 4] { self.shape }

    pub fn channels(&self) -> usize { self.shape[0] }

    /// Spatial extent [X, Y, Z].
    pub fn extent(&self) -> [usize; 3] { [self.shape[1], self.shape[2], self.shape[3]] }

    pub fn data_mut(&mut self) -> &mut [f32] { &mut self.data }

    pub fn into_data(self) -> Vec<f32> { self.data }

    /// The voxels of one modality.
    pub fn channel(&self, c: usize) -> &[f32] {
        let voxels = self.extent().iter().product::<usize>();
        &self.data[c * voxels..(c + 1) * voxels]
    }

    /// Per-channel first and second moments over non-zero voxels.
    pub fn brain_moments(&self) -> Vec<Moments> {
        (0..self.channels())
            .map(|c| {
                self.channel(c)
                    .iter()
                    .filter(|v| **v != 0.0)
                    .fold(Moments::default(), |m, &v| m.push(v as f64))
            })
            .collect()
    }
}

// ─── LabelVolume ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume {
    shape: [usize; 3],
    data:  Vec<u8>,
}

impl LabelVolume {
    pub fn new(shape: [usize; 3], data: Vec<u8>) -> Result<Self, ShapeError> {
        if shape.iter().product::<usize>() != data.len() {
            return Err(ShapeError::Length { shape: shape.to_vec(), len: data.len() });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 3] { self.shape }

    pub fn data(&self) -> &[u8] { &self.data }

    pub fn data_mut(&mut self) -> &mut [u8] { &mut self.data }

    pub fn into_data(self) -> Vec<u8> { self.data }
}

// ─── Subject ─────────────────────────────────────────────────────────────────
/// One scan and its annotation. The spatial extents always agree.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id:     String,
    pub volume: Volume,
    pub label:  LabelVolume,
}

impl Subject {
    pub fn new(id: impl Into<String>, volume: Volume, label: LabelVolume) -> Result<Self, ShapeError> {
        if volume.extent() != label.shape() {
            return Err(ShapeError::Extent { volume: volume.extent(), label: label.shape() });
        }
        Ok(Self { id: id.into(), volume, label })
    }
}

// ─── Moments ─────────────────────────────────────────────────────────────────
/// Running count, sum and sum of squares. Mergeable, so partial
/// results from parallel workers can be reduced.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub count:  u64,
    pub sum:    f64,
    pub sum_sq: f64,
}

impl Moments {
    pub fn push(self, v: f64) -> Self {
        Self { count: self.count + 1, sum: self.sum + v, sum_sq: self.sum_sq + v * v }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            count:  self.count + other.count,
            sum:    self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
        }
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }

    pub fn std(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.count as f64 - mean * mean).max(0.0).sqrt()
    }
}

// ─── NormStats ───────────────────────────────────────────────────────────────
/// Per-modality normalisation statistics.
///
/// Computed once from the training subjects and handed, unchanged,
/// to every other dataset of the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormStats {
    pub means: Vec<f32>,
    pub norm:  Vec<f32>,
}

impl NormStats {
    /// Scales below this are treated as a constant channel.
    const MIN_SCALE: f64 = 1e-8;

    /// Reduce per-channel moments into mean / standard deviation.
    pub fn from_moments(moments: &[Moments]) -> Self {
        let means = moments.iter().map(|m| m.mean() as f32).collect();
        let norm  = moments
            .iter()
            .map(|m| {
                let s = m.std();
                if s < Self::MIN_SCALE { 1.0 } else { s as f32 }
            })
            .collect();
        Self { means, norm }
    }

    pub fn channels(&self) -> usize { self.means.len() }

    /// Normalise brain voxels in place: `(v - mean) / norm`.
    /// Background voxels (exactly zero) stay zero.
    pub fn apply(&self, volume: &mut Volume) {
        let voxels = volume.extent().iter().product::<usize>();
        for (c, chunk) in volume.data.chunks_mut(voxels).enumerate() {
            let (mean, norm) = (self.means[c], self.norm[c]);
            for v in chunk.iter_mut().filter(|v| **v != 0.0) {
                *v = (*v - mean) / norm;
            }
        }
    }
}
