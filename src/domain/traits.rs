// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The seams between the training driver and its collaborators:
//
//   VolumeReader       — turns a subject folder into a Subject
//                        (NIfTI on disk, synthetic in tests)
//   MetricAccumulator  — accumulates mask comparisons and
//                        produces a score on demand
//
// Mode is the explicit train/eval switch handed to datasets
// instead of a mutable flag living on the dataset itself.

use anyhow::Result;
use std::path::Path;

use crate::domain::volume::Subject;

// ─── Mode ─────────────────────────────────────────────────────────────────────
/// How a dataset view produces samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    /// Random crops with augmentation applied with probability
    /// `trans_prob` (clamped to [0, 1] by the dataset).
    Train { trans_prob: f64 },
    /// Full volumes, no augmentation.
    Eval,
}

// ─── VolumeReader ─────────────────────────────────────────────────────────────
/// Any component that can load one subject from its folder.
///
/// Implementations:
///   - NiftiReader → `<id>_{flair,t1,t1ce,t2,seg}.nii[.gz]`
pub trait VolumeReader: Send + Sync {
    fn read_subject(&self, folder: &Path) -> Result<Subject>;
}

// ─── MetricAccumulator ────────────────────────────────────────────────────────
/// Stateful comparison of predicted and ground-truth masks.
pub trait MetricAccumulator {
    /// Name used when reporting the score.
    fn name(&self) -> &'static str;

    /// Add one sample's prediction / label masks (same length).
    fn add_result(&mut self, predict: &[bool], label: &[bool]);

    /// Score over everything added so far.
    fn eval(&self) -> f64;
}
