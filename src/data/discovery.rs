// ============================================================
// Layer 4 — Subject Discovery
// ============================================================
// The BRATS training release is laid out as one folder per
// tumour grade, each holding one folder per subject:
//
//   <data_root>/
//     HGG/   Brats18_2013_2_1/  Brats18_CBICA_AAB_1/  ...
//     LGG/   Brats18_2013_0_1/  ...
//
// Only sub-directories are kept; stray files (README, .DS_Store)
// are ignored. Folders are sorted lexicographically by name so
// the train/validation split is identical on every machine.
//
// Reference: Rust Book §9 (Error Handling)
//            std::fs::read_dir documentation

use std::{fs, path::{Path, PathBuf}};

use crate::data::{DataError, DataResult};

/// High-grade glioma sub-directory name.
pub const HGG_DIR: &str = "HGG";

/// Low-grade glioma sub-directory name.
pub const LGG_DIR: &str = "LGG";

/// Subject folders of both tumour grades.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GradeFolders {
    pub hgg: Vec<PathBuf>,
    pub lgg: Vec<PathBuf>,
}

/// List the immediate sub-directories of `root`, sorted by name.
pub fn discover_subjects(root: &Path) -> DataResult<Vec<PathBuf>> {
    let io_err = |source| DataError::Io { path: root.to_path_buf(), source };

    let mut folders = Vec::new();
    for entry in fs::read_dir(root).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if entry.file_type().map_err(io_err)?.is_dir() {
            folders.push(entry.path());
        }
    }

    folders.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(folders)
}

/// Discover the HGG and LGG subject folders under `data_root`.
pub fn discover_grades(data_root: &Path) -> DataResult<GradeFolders> {
    let hgg = discover_subjects(&data_root.join(HGG_DIR))?;
    let lgg = discover_subjects(&data_root.join(LGG_DIR))?;

    tracing::info!(
        "Discovered {} HGG and {} LGG subjects under {}",
        hgg.len(),
        lgg.len(),
        data_root.display()
    );

    Ok(GradeFolders { hgg, lgg })
}
