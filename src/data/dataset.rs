// ============================================================
// Layer 4 — BRATS Dataset
// ============================================================
// Holds every subject of one split in memory, normalised, and
// hands out Burn Dataset views for a given Mode.
//
//   BratsDataset::fit        → training split, computes NormStats
//   BratsDataset::with_stats → any other split, stats passed in
//
// The validation split must share the training statistics, so
// its constructor takes them as a required argument and never
// looks at its own intensities.
//
//   view(Mode::Train { p }) → random [x, y, z] crop, flips w.p. p
//   view(Mode::Eval)        → the full normalised subject
//
// Subjects are read in parallel with rayon and shared between
// views through an Arc, so building a view per epoch is cheap.
//
// Reference: Burn Book §4 (Dataset)
//            rayon documentation (par_iter)

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use burn::data::dataset::Dataset;
use rayon::prelude::*;

use crate::data::{augment, DataError};
use crate::domain::traits::{Mode, VolumeReader};
use crate::domain::volume::{LabelVolume, Moments, NormStats, Subject, Volume};

// ─── VolumeItem ───────────────────────────────────────────────────────────────
/// One (volume, label) sample as produced by a DatasetView.
#[derive(Debug, Clone)]
pub struct VolumeItem {
    pub volume: Volume,
    pub label:  LabelVolume,
}

// ─── BratsDataset ─────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct BratsDataset {
    subjects:     Arc<Vec<Subject>>,
    stats:        NormStats,
    sample_shape: [usize; 3],
}

impl BratsDataset {
    /// Load the training split and fit normalisation statistics on it.
    pub fn fit(folders: &[PathBuf], reader: &dyn VolumeReader, sample_shape: [usize; 3]) -> Result<Self> {
        let subjects = load_subjects(folders, reader)?;
        let stats    = fit_stats(&subjects);

        tracing::info!(
            "Normalisation stats from {} subjects: means={:?} norm={:?}",
            subjects.len(),
            stats.means,
            stats.norm
        );

        Self::assemble(subjects, stats, sample_shape)
    }

    /// Load a split normalised with statistics computed elsewhere.
    pub fn with_stats(
        folders: &[PathBuf],
        reader: &dyn VolumeReader,
        stats: NormStats,
        sample_shape: [usize; 3],
    ) -> Result<Self> {
        let subjects = load_subjects(folders, reader)?;
        Self::assemble(subjects, stats, sample_shape)
    }

    fn assemble(mut subjects: Vec<Subject>, stats: NormStats, sample_shape: [usize; 3]) -> Result<Self> {
        for subject in &mut subjects {
            let found = subject.volume.channels();
            if found != stats.channels() {
                return Err(DataError::ChannelMismatch {
                    subject:  subject.id.clone(),
                    expected: stats.channels(),
                    found,
                }
                .into());
            }
            let extent = subject.volume.extent();
            if (0..3).any(|i| sample_shape[i] > extent[i]) {
                return Err(DataError::CropTooLarge {
                    subject: subject.id.clone(),
                    sample:  sample_shape,
                    extent,
                }
                .into());
            }
            stats.apply(&mut subject.volume);
        }

        Ok(Self { subjects: Arc::new(subjects), stats, sample_shape })
    }

    pub fn stats(&self) -> &NormStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    /// A Burn Dataset over these subjects producing samples in `mode`.
    pub fn view(&self, mode: Mode) -> DatasetView {
        DatasetView {
            subjects:     Arc::clone(&self.subjects),
            sample_shape: self.sample_shape,
            mode,
        }
    }
}

fn load_subjects(folders: &[PathBuf], reader: &dyn VolumeReader) -> Result<Vec<Subject>> {
    let subjects = folders
        .par_iter()
        .map(|folder| {
            reader
                .read_subject(folder)
                .with_context(|| format!("Failed to load subject {}", folder.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!("Loaded {} subjects", subjects.len());
    Ok(subjects)
}

/// Per-modality mean / std over the brain voxels of every subject.
fn fit_stats(subjects: &[Subject]) -> NormStats {
    let channels = subjects.first().map(|s| s.volume.channels()).unwrap_or(0);
    let moments = subjects
        .par_iter()
        .map(|s| s.volume.brain_moments())
        .reduce(
            || vec![Moments::default(); channels],
            |a, b| a.into_iter().zip(b).map(|(x, y)| x.merge(y)).collect(),
        );
    NormStats::from_moments(&moments)
}

// ─── DatasetView ──────────────────────────────────────────────────────────────
/// Owned, mode-fixed view over a BratsDataset.
#[derive(Debug, Clone)]
pub struct DatasetView {
    subjects:     Arc<Vec<Subject>>,
    sample_shape: [usize; 3],
    mode:         Mode,
}

impl DatasetView {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn train_sample(&self, subject: &Subject, trans_prob: f64) -> Result<VolumeItem, DataError> {
        let prob = if trans_prob.is_nan() { 0.0 } else { trans_prob.clamp(0.0, 1.0) };
        let mut rng = rand::thread_rng();

        let (mut volume, mut label) = augment::random_crop(subject, self.sample_shape, &mut rng)?;
        augment::random_flip(&mut volume, &mut label, prob, &mut rng);
        Ok(VolumeItem { volume, label })
    }
}

impl Dataset<VolumeItem> for DatasetView {
    fn get(&self, index: usize) -> Option<VolumeItem> {
        let subject = self.subjects.get(index)?;
        match self.mode {
            Mode::Eval => Some(VolumeItem {
                volume: subject.volume.clone(),
                label:  subject.label.clone(),
            }),
            // A None here would end the epoch early, so a failed sample aborts the run
            Mode::Train { trans_prob } => match self.train_sample(subject, trans_prob) {
                Ok(item) => Some(item),
                Err(e) => panic!("Sampling {} failed: {e}", subject.id),
            },
        }
    }

    fn len(&self) -> usize {
        self.subjects.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::{folders, subject_value, SyntheticReader, BROKEN};

    const EXTENT: [usize; 3] = [4, 4, 6];

    fn train_set() -> BratsDataset {
        BratsDataset::fit(&folders("h", 3), &SyntheticReader::new(EXTENT), [2, 2, 3]).unwrap()
    }

    #[test]
    fn test_fit_computes_brain_stats() {
        let ds = train_set();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.stats().channels(), 4);
        // channel c is shifted by 10·c, so means are 10 apart
        let m = &ds.stats().means;
        assert!((m[1] - m[0] - 10.0).abs() < 1e-4);
        assert!(ds.stats().norm.iter().all(|n| *n > 0.0));
    }

    #[test]
    fn test_with_stats_reuses_training_stats() {
        let train = train_set();
        let val = BratsDataset::with_stats(
            &folders("l", 2),
            &SyntheticReader::new(EXTENT),
            train.stats().clone(),
            [2, 2, 3],
        )
        .unwrap();
        assert_eq!(val.stats(), train.stats());
    }

    #[test]
    fn test_background_stays_zero() {
        let ds = train_set();
        let item = ds.view(Mode::Eval).get(0).unwrap();
        for c in 0..4 {
            let channel = item.volume.channel(c);
            for (i, v) in channel.iter().enumerate() {
                if subject_value("h0", c, i) == 0.0 {
                    assert_eq!(*v, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_eval_view_returns_full_volume() {
        let ds = train_set();
        let view = ds.view(Mode::Eval);
        assert_eq!(view.len(), 3);
        let item = view.get(2).unwrap();
        assert_eq!(item.volume.shape(), [4, 4, 4, 6]);
        assert_eq!(item.label.shape(), EXTENT);
        assert!(view.get(3).is_none());
    }

    #[test]
    fn test_train_view_crops_to_sample_shape() {
        let ds = train_set();
        let view = ds.view(Mode::Train { trans_prob: 0.5 });
        let item = view.get(1).unwrap();
        assert_eq!(item.volume.shape(), [4, 2, 2, 3]);
        assert_eq!(item.label.shape(), [2, 2, 3]);
    }

    #[test]
    fn test_train_view_clamps_probability() {
        let ds = train_set();
        for p in [-1.0, 1.1, 5.0, f64::NAN] {
            assert!(ds.view(Mode::Train { trans_prob: p }).get(0).is_some());
        }
    }

    #[test]
    fn test_sample_shape_larger_than_subject() {
        let err = BratsDataset::fit(&folders("h", 1), &SyntheticReader::new(EXTENT), [8, 2, 2]).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::CropTooLarge { .. })));
    }

    #[test]
    #[should_panic(expected = "Sampling h0 failed")]
    fn test_failed_train_sample_aborts_instead_of_ending_epoch() {
        let ds = train_set();
        let mut view = ds.view(Mode::Train { trans_prob: 0.0 });
        view.sample_shape = [8, 8, 8];
        let _ = view.get(0);
    }

    #[test]
    fn test_channel_mismatch_with_foreign_stats() {
        let stats = NormStats { means: vec![0.0; 2], norm: vec![1.0; 2] };
        let err = BratsDataset::with_stats(&folders("l", 1), &SyntheticReader::new(EXTENT), stats, [1, 1, 1])
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::ChannelMismatch { .. })));
    }

    #[test]
    fn test_reader_failure_propagates() {
        let mut list = folders("h", 2);
        list.push(PathBuf::from(BROKEN));
        let err = BratsDataset::fit(&list, &SyntheticReader::new(EXTENT), [1, 1, 1]).unwrap_err();
        assert!(err.to_string().contains("Failed to load subject"));
    }
}
