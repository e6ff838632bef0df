// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration
//   Step 2: Prepare the model directory     (Layer 6 - infra)
//   Step 3: Discover HGG / LGG subjects     (Layer 4 - data)
//   Step 4: Fixed-count train / val split   (Layer 4 - data)
//   Step 5: Build datasets, train first     (Layer 4 - data)
//   Step 6: Save config and stats           (Layer 6 - infra)
//   Step 7: Run training loop               (Layer 5 - ml)
//
// The validation dataset is built from the training dataset's
// normalisation stats; it never computes its own.
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::{
    dataset::BratsDataset,
    discovery::discover_grades,
    loader::NiftiReader,
    splitter::{split_by_grade, Split, SplitCounts},
    DataError,
};
use crate::domain::{region::ENHANCING_CLASS, traits::VolumeReader, volume::NUM_MODALITIES};
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::{
    inference::DEFAULT_CHUNK_SIZE,
    loss::LossKind,
    model::VoxResNetConfig,
    trainer::{run_training, TrainSummary},
};

// ─── Augmentation Ramp ───────────────────────────────────────────────────────
/// Linear schedule of the augmentation probability:
/// `base + epoch / horizon`. Values above 1 are clamped by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentRamp {
    pub base:    f64,
    pub horizon: usize,
}

impl Default for AugmentRamp {
    fn default() -> Self {
        Self { base: 0.1, horizon: 3000 }
    }
}

impl AugmentRamp {
    pub fn prob_at(&self, epoch: usize) -> f64 {
        self.base + epoch as f64 / self.horizon as f64
    }
}

// ─── Evaluation Policy ───────────────────────────────────────────────────────
/// When to score the model during training. Disabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalPolicy {
    /// Evaluate every `every` epochs (epoch % every == 0)
    pub every: Option<usize>,

    /// Also score the training subjects (full volumes, no augmentation)
    pub on_train: bool,
}

impl Default for EvalPolicy {
    fn default() -> Self {
        Self { every: None, on_train: true }
    }
}

impl EvalPolicy {
    pub fn is_due(&self, epoch: usize) -> bool {
        matches!(self.every, Some(k) if k > 0 && epoch % k == 0)
    }
}

// ─── Experiment Configuration ────────────────────────────────────────────────
// All settings of one training run.
// Serialisable so it can be saved next to the checkpoints and
// reloaded by `evaluate`. Missing JSON fields fall back to the
// defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub data_root:        PathBuf,
    pub model_dir:        PathBuf,
    pub split:            SplitCounts,
    pub sample_shape:     [usize; 3],
    pub num_epochs:       usize,
    pub batch_size:       usize,
    pub num_workers:      usize,
    pub learning_rate:    f64,
    pub seed:             u64,
    pub checkpoint_every: usize,
    pub chunk_size:       usize,
    pub augment:          AugmentRamp,
    pub eval:             EvalPolicy,
    pub loss:             LossKind,
    pub devices:          Vec<usize>,
    pub model:            VoxResNetConfig,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_root:        PathBuf::from("./data/BRATS/train"),
            model_dir:        PathBuf::from("model"),
            split:            SplitCounts::default(),
            sample_shape:     [128, 128, 12],
            num_epochs:       6000,
            batch_size:       40,
            num_workers:      12,
            learning_rate:    1e-4,
            seed:             42,
            checkpoint_every: 200,
            chunk_size:       DEFAULT_CHUNK_SIZE,
            augment:          AugmentRamp::default(),
            eval:             EvalPolicy::default(),
            loss:             LossKind::CrossEntropy,
            devices:          vec![0, 1, 2, 3],
            model:            VoxResNetConfig::new(),
        }
    }
}

impl ExperimentConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config from '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config in '{}'", path.display()))
    }

    /// Reject settings the training loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.num_epochs > 0, "num_epochs must be at least 1");
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            self.learning_rate.is_finite() && self.learning_rate > 0.0,
            "learning_rate must be positive, got {}",
            self.learning_rate
        );
        ensure!(self.checkpoint_every > 0, "checkpoint_every must be at least 1");
        ensure!(self.chunk_size > 0, "chunk_size must be at least 1");
        ensure!(
            self.sample_shape.iter().all(|&d| d > 0),
            "sample_shape must be positive in every axis, got {:?}",
            self.sample_shape
        );
        ensure!(self.augment.horizon > 0, "augment.horizon must be at least 1");
        ensure!(self.augment.base.is_finite(), "augment.base must be finite");
        ensure!(self.eval.every != Some(0), "eval.every must be at least 1 when set");
        if let LossKind::Focal { gamma } = self.loss {
            ensure!(gamma.is_finite() && gamma >= 0.0, "focal gamma must be non-negative");
        }
        ensure!(
            self.model.in_channels == NUM_MODALITIES,
            "model.in_channels must be {NUM_MODALITIES}, got {}",
            self.model.in_channels
        );
        ensure!(
            self.model.num_classes > ENHANCING_CLASS as usize,
            "model.num_classes must be above {ENHANCING_CLASS}, got {}",
            self.model.num_classes
        );
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
// Owns the config and runs the full training pipeline.
pub struct TrainUseCase {
    config: ExperimentConfig,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config }
    }

    /// Discover subject folders under `data_root` and split them.
    pub fn discover_split(&self) -> Result<Split<PathBuf>> {
        let cfg    = &self.config;
        let grades = discover_grades(&cfg.data_root)
            .with_context(|| format!("Cannot list subjects under '{}'", cfg.data_root.display()))?;
        let split  = split_by_grade(grades.hgg, grades.lgg, cfg.split);
        tracing::info!("Split: {} train, {} validation", split.train.len(), split.val.len());
        Ok(split)
    }

    /// Build the training dataset first, then validation with its stats.
    pub fn build_datasets(
        &self,
        split: &Split<PathBuf>,
        reader: &dyn VolumeReader,
    ) -> Result<(BratsDataset, BratsDataset)> {
        if split.train.is_empty() {
            return Err(DataError::EmptySplit { split: "training".into() }.into());
        }
        let shape = self.config.sample_shape;

        let train = BratsDataset::fit(&split.train, reader, shape).context("Building training dataset")?;
        let val   = BratsDataset::with_stats(&split.val, reader, train.stats().clone(), shape)
            .context("Building validation dataset")?;

        if val.is_empty() {
            tracing::warn!("Validation split is empty");
        }
        Ok((train, val))
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate configuration ────────────────────────────────────
        cfg.validate().context("Invalid experiment configuration")?;

        // ── Step 2: Model directory ───────────────────────────────────────────
        // Created (or verified) before any data is read
        let ckpt_manager = CheckpointManager::new(&cfg.model_dir)?;

        // ── Steps 3-4: Discover and split subjects ────────────────────────────
        let split = self.discover_split()?;

        // ── Step 5: Datasets ──────────────────────────────────────────────────
        let (train, val) = self.build_datasets(&split, &NiftiReader::new())?;

        // ── Step 6: Save config and stats for evaluation ──────────────────────
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_stats(train.stats())?;
        let metrics = MetricsLogger::new(ckpt_manager.dir())?;

        // ── Step 7: Run training loop (Layer 5) ───────────────────────────────
        run_training(cfg, &train, &val, &ckpt_manager, &metrics)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::{folders, SyntheticReader, BROKEN};

    fn small_config() -> ExperimentConfig {
        ExperimentConfig { sample_shape: [2, 2, 2], ..ExperimentConfig::default() }
    }

    #[test]
    fn test_defaults_reproduce_reference_run() {
        let cfg = ExperimentConfig::default();
        assert_eq!(cfg.num_epochs, 6000);
        assert_eq!(cfg.batch_size, 40);
        assert_eq!(cfg.num_workers, 12);
        assert_eq!(cfg.learning_rate, 1e-4);
        assert_eq!(cfg.checkpoint_every, 200);
        assert_eq!(cfg.split, SplitCounts { hgg: 200, lgg: 50 });
        assert_eq!(cfg.sample_shape, [128, 128, 12]);
        assert_eq!(cfg.eval.every, None);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_ramp_values() {
        let ramp = AugmentRamp::default();
        assert!((ramp.prob_at(0) - 0.1).abs() < 1e-12);
        assert!((ramp.prob_at(3000) - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_ramp_strictly_increasing() {
        let ramp = AugmentRamp::default();
        for epoch in 0..3000 {
            assert!(ramp.prob_at(epoch + 1) > ramp.prob_at(epoch));
        }
    }

    #[test]
    fn test_eval_policy_due() {
        let off = EvalPolicy::default();
        assert!(!off.is_due(0));

        let every20 = EvalPolicy { every: Some(20), on_train: false };
        assert!(every20.is_due(0));
        assert!(every20.is_due(40));
        assert!(!every20.is_due(21));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            ExperimentConfig { num_epochs: 0, ..ExperimentConfig::default() },
            ExperimentConfig { batch_size: 0, ..ExperimentConfig::default() },
            ExperimentConfig { learning_rate: f64::NAN, ..ExperimentConfig::default() },
            ExperimentConfig { checkpoint_every: 0, ..ExperimentConfig::default() },
            ExperimentConfig { chunk_size: 0, ..ExperimentConfig::default() },
            ExperimentConfig { sample_shape: [128, 0, 12], ..ExperimentConfig::default() },
            ExperimentConfig { eval: EvalPolicy { every: Some(0), on_train: true }, ..ExperimentConfig::default() },
            ExperimentConfig { loss: LossKind::Focal { gamma: -1.0 }, ..ExperimentConfig::default() },
            ExperimentConfig { model: VoxResNetConfig::new().with_num_classes(4), ..ExperimentConfig::default() },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?} should be rejected");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        fs::write(&path, r#"{ "num_epochs": 3, "eval": { "every": 1, "on_train": false } }"#).unwrap();

        let cfg = ExperimentConfig::load(&path).unwrap();
        assert_eq!(cfg.num_epochs, 3);
        assert_eq!(cfg.eval.every, Some(1));
        assert_eq!(cfg.batch_size, 40);
    }

    #[test]
    fn test_validation_stats_equal_training_stats() {
        let use_case = TrainUseCase::new(small_config());
        let split = Split { train: folders("h", 3), val: folders("l", 2) };

        let (train, val) = use_case.build_datasets(&split, &SyntheticReader::new([3, 3, 3])).unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 2);
        assert_eq!(val.stats(), train.stats());
    }

    #[test]
    fn test_empty_training_split_fails() {
        let use_case = TrainUseCase::new(small_config());
        let split = Split { train: Vec::new(), val: folders("l", 2) };

        let err = use_case.build_datasets(&split, &SyntheticReader::new([3, 3, 3])).unwrap_err();
        assert!(matches!(err.downcast_ref::<DataError>(), Some(DataError::EmptySplit { .. })));
    }

    #[test]
    fn test_bad_validation_subject_fails_setup() {
        let use_case = TrainUseCase::new(small_config());
        let split = Split { train: folders("h", 1), val: vec![PathBuf::from(BROKEN)] };
        assert!(use_case.build_datasets(&split, &SyntheticReader::new([3, 3, 3])).is_err());
    }

    #[test]
    fn test_discover_split_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["HGG/h0", "HGG/h1", "HGG/h2", "LGG/l0", "LGG/l1"] {
            fs::create_dir_all(dir.path().join(name)).unwrap();
        }
        let cfg = ExperimentConfig {
            data_root: dir.path().to_path_buf(),
            split: SplitCounts { hgg: 2, lgg: 1 },
            ..ExperimentConfig::default()
        };

        let split = TrainUseCase::new(cfg).discover_split().unwrap();
        let names = |v: &[PathBuf]| -> Vec<String> {
            v.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect()
        };
        assert_eq!(names(&split.train), vec!["h0", "h1", "l0"]);
        assert_eq!(names(&split.val), vec!["h2", "l1"]);
    }
}
