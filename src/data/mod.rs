// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from subject folders on disk to tensor batches.
//
//   ./data/BRATS/train/{HGG,LGG}/<subject>/
//       │
//       ▼
//   discovery     → sorted subject folders per tumour grade
//       │
//       ▼
//   splitter      → fixed-count train / validation split
//       │
//       ▼
//   loader        → NIfTI modalities + segmentation → Subject
//       │
//       ▼
//   BratsDataset  → normalised subjects, Burn Dataset views
//       │            (random crop + flips in train mode)
//       ▼
//   VolumeBatcher → stacks items into [N, C, X, Y, Z] batches
//       │
//       ▼
//   DataLoader    → multi-threaded batch prefetching (Burn)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::volume::ShapeError;

/// Lists subject folders per tumour grade
pub mod discovery;

/// Fixed-count train/validation split
pub mod splitter;

/// Reads BRATS NIfTI files into Subjects
pub mod loader;

/// Random crop and flip augmentation on host buffers
pub mod augment;

/// Implements Burn's Dataset trait for BRATS subjects
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

#[cfg(test)]
pub(crate) mod testing;

pub type DataResult<T> = Result<T, DataError>;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("nifti error at {path}: {source}")]
    Nifti {
        path: PathBuf,
        #[source]
        source: nifti::NiftiError,
    },
    #[error("expected a 3-D image at {path}, found shape {shape:?}")]
    NotVolumetric { path: PathBuf, shape: Vec<usize> },
    #[error("subject folder {folder} has no '{modality}' image")]
    MissingModality { folder: PathBuf, modality: String },
    #[error("subject {subject}: {source}")]
    Shape {
        subject: String,
        #[source]
        source: ShapeError,
    },
    #[error("subject {subject} has {found} channels, normalisation expects {expected}")]
    ChannelMismatch { subject: String, expected: usize, found: usize },
    #[error("sample shape {sample:?} exceeds extent {extent:?} of subject {subject}")]
    CropTooLarge { subject: String, sample: [usize; 3], extent: [usize; 3] },
    #[error("the {split} split contains no subjects")]
    EmptySplit { split: String },
    #[error("cannot collate an empty batch")]
    EmptyBatch,
    #[error("batch item {index} has shape {found:?}, expected {expected:?}")]
    ShapeMismatch { index: usize, expected: Vec<usize>, found: Vec<usize> },
}
