// ============================================================
// Test Fixtures — Synthetic Subjects
// ============================================================
// An in-memory VolumeReader so dataset, evaluator and trainer
// tests run without NIfTI files on disk.
//
// Voxel values are a deterministic function of the folder name,
// the channel and the voxel index; every fourth voxel is zero
// (background). Labels cycle through the BRATS classes.

use std::path::{Path, PathBuf};

use crate::data::DataError;
use crate::domain::traits::VolumeReader;
use crate::domain::volume::{LabelVolume, Subject, Volume, NUM_MODALITIES};

pub const CLASSES: [u8; 4] = [0, 1, 2, 4];

/// Folder name that makes SyntheticReader fail.
pub const BROKEN: &str = "broken";

#[derive(Debug, Clone)]
pub struct SyntheticReader {
    pub extent: [usize; 3],
}

impl SyntheticReader {
    pub fn new(extent: [usize; 3]) -> Self {
        Self { extent }
    }
}

pub fn subject_value(name: &str, channel: usize, voxel: usize) -> f32 {
    if voxel % 4 == 0 {
        return 0.0;
    }
    let seed = name.bytes().map(usize::from).sum::<usize>() % 5;
    (1 + seed + channel * 10 + voxel % 7) as f32
}

impl VolumeReader for SyntheticReader {
    fn read_subject(&self, folder: &Path) -> anyhow::Result<Subject> {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name == BROKEN {
            return Err(DataError::MissingModality { folder: folder.to_path_buf(), modality: "flair".into() }.into());
        }

        let voxels = self.extent.iter().product::<usize>();
        let channels = (0..NUM_MODALITIES)
            .map(|c| (0..voxels).map(|i| subject_value(&name, c, i)).collect())
            .collect();
        let volume = Volume::from_channels(self.extent, channels)?;
        let label  = LabelVolume::new(self.extent, (0..voxels).map(|i| CLASSES[i % 4]).collect())?;
        Ok(Subject::new(name, volume, label)?)
    }
}

/// Folder paths named `prefix0`, `prefix1`, ...
pub fn folders(prefix: &str, n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("{prefix}{i}"))).collect()
}

/// Every channel holds the voxel's class as an intensity, so with
/// identity stats a network can read the label back from channel 0.
#[derive(Debug, Clone)]
pub struct LabelEchoReader {
    pub extent: [usize; 3],
}

impl VolumeReader for LabelEchoReader {
    fn read_subject(&self, folder: &Path) -> anyhow::Result<Subject> {
        let name = folder.to_string_lossy().into_owned();
        let voxels = self.extent.iter().product::<usize>();
        let classes: Vec<u8> = (0..voxels).map(|i| CLASSES[i % 4]).collect();
        let channel: Vec<f32> = classes.iter().map(|&c| f32::from(c)).collect();
        let volume = Volume::from_channels(self.extent, vec![channel; NUM_MODALITIES])?;
        let label  = LabelVolume::new(self.extent, classes)?;
        Ok(Subject::new(name, volume, label)?)
    }
}

/// Stats that leave intensities untouched.
pub fn identity_stats() -> crate::domain::volume::NormStats {
    crate::domain::volume::NormStats {
        means: vec![0.0; NUM_MODALITIES],
        norm:  vec![1.0; NUM_MODALITIES],
    }
}
