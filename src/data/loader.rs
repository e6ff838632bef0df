// ============================================================
// Layer 4 — NIfTI Subject Loader
// ============================================================
// Reads one BRATS subject folder into a Subject using the
// nifti crate.
//
// A subject folder holds five images sharing one spatial grid:
//
//   Brats18_CBICA_AAB_1/
//     Brats18_CBICA_AAB_1_flair.nii.gz
//     Brats18_CBICA_AAB_1_t1.nii.gz
//     Brats18_CBICA_AAB_1_t1ce.nii.gz
//     Brats18_CBICA_AAB_1_t2.nii.gz
//     Brats18_CBICA_AAB_1_seg.nii.gz     ← expert annotation
//
// Files are matched by suffix (`_t1.nii` does not match
// `_t1ce.nii`), both plain and gzipped. Each image is decoded
// to an ndarray in [X, Y, Z] order and flattened row-major, so
// Z (the axial slice) varies fastest.
//
// Reference: nifti crate documentation (ReaderOptions, IntoNdArray)
//            Rust Book §9 (Error Handling)

use std::{fs, path::{Path, PathBuf}};

use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::data::{DataError, DataResult};
use crate::domain::traits::VolumeReader;
use crate::domain::volume::{LabelVolume, Subject, Volume, MODALITIES};

/// Suffix of the segmentation image.
pub const LABEL_SUFFIX: &str = "seg";

/// Loads BRATS subjects stored as NIfTI-1 files.
/// Implements the VolumeReader trait from Layer 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiReader;

impl NiftiReader {
    pub fn new() -> Self {
        Self
    }

    /// Find `<anything>_<suffix>.nii` or `<anything>_<suffix>.nii.gz`.
    pub fn find_image(folder: &Path, suffix: &str) -> DataResult<PathBuf> {
        let io_err = |source| DataError::Io { path: folder.to_path_buf(), source };
        let plain  = format!("_{suffix}.nii");
        let zipped = format!("_{suffix}.nii.gz");

        let mut matches = Vec::new();
        for entry in fs::read_dir(folder).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with(&plain) || name.ends_with(&zipped) {
                matches.push(path);
            }
        }

        // Prefer a deterministic pick when both .nii and .nii.gz exist
        matches.sort();
        matches.into_iter().next().ok_or_else(|| DataError::MissingModality {
            folder:   folder.to_path_buf(),
            modality: suffix.to_string(),
        })
    }

    /// Decode one image into its extent and row-major voxels.
    pub fn read_image(path: &Path) -> DataResult<([usize; 3], Vec<f32>)> {
        let nifti_err = |source| DataError::Nifti { path: path.to_path_buf(), source };

        let object = ReaderOptions::new().read_file(path).map_err(nifti_err)?;
        let array  = object.into_volume().into_ndarray::<f32>().map_err(nifti_err)?;

        // Some exporters write a trailing singleton time axis
        let mut shape = array.shape().to_vec();
        while shape.len() > 3 && shape.last() == Some(&1) {
            shape.pop();
        }
        let extent: [usize; 3] = shape
            .as_slice()
            .try_into()
            .map_err(|_| DataError::NotVolumetric { path: path.to_path_buf(), shape: shape.clone() })?;

        // ndarray iterates in logical (row-major) order whatever the memory layout
        let voxels = array.iter().copied().collect();
        Ok((extent, voxels))
    }
}

impl VolumeReader for NiftiReader {
    fn read_subject(&self, folder: &Path) -> anyhow::Result<Subject> {
        let id = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| folder.display().to_string());

        // ── Modalities in channel order ───────────────────────────────────────
        let mut extent   = None;
        let mut channels = Vec::with_capacity(MODALITIES.len());
        for modality in MODALITIES {
            let path = Self::find_image(folder, modality)?;
            let (shape, voxels) = Self::read_image(&path)?;
            match extent {
                None => extent = Some(shape),
                Some(expected) if expected != shape => {
                    return Err(DataError::ShapeMismatch {
                        index:    channels.len(),
                        expected: expected.to_vec(),
                        found:    shape.to_vec(),
                    }
                    .into());
                }
                Some(_) => {}
            }
            channels.push(voxels);
        }
        let extent = extent.unwrap_or_default();

        let shape_err = |source| DataError::Shape { subject: id.clone(), source };
        let volume = Volume::from_channels(extent, channels).map_err(shape_err)?;

        // ── Segmentation ──────────────────────────────────────────────────────
        // Stored as float in most releases; classes are small integers
        let seg_path = Self::find_image(folder, LABEL_SUFFIX)?;
        let (seg_extent, seg) = Self::read_image(&seg_path)?;
        let classes = seg.into_iter().map(|v| v.round().clamp(0.0, 255.0) as u8).collect();
        let label   = LabelVolume::new(seg_extent, classes).map_err(shape_err)?;

        let subject = Subject::new(id.clone(), volume, label).map_err(shape_err)?;
        tracing::debug!("Loaded subject {} with extent {:?}", id, extent);
        Ok(subject)
    }
}
