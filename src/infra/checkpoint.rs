// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// File layout inside the model directory:
//
//   model/
//     epoch_0.mpk          ← weights after epoch 0
//     epoch_200.mpk        ← every `checkpoint_every` epochs
//     ...
//     max_fscore.mpk       ← best validation F-score so far
//     latest_epoch.json    ← number of the newest epoch_<N>
//     train_config.json    ← the ExperimentConfig of the run
//     norm_stats.json      ← training normalisation statistics
//
// Checkpoints are written once and never pruned. The config and
// stats are saved so `evaluate` can rebuild the exact same network
// and normalise subjects exactly as training did.
//
// CompactRecorder:
//   - Serialises parameters to MessagePack (.mpk)
//   - Half precision on disk
//   - Loading fails if the architecture does not match
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, ensure, Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{
    prelude::*,
    record::CompactRecorder,
};

use crate::application::train_use_case::ExperimentConfig;
use crate::domain::volume::NormStats;

/// Name of the best-score checkpoint.
pub const BEST_CHECKPOINT: &str = "max_fscore";

/// Selector for the newest epoch checkpoint.
pub const LATEST: &str = "latest";

const LATEST_FILE: &str = "latest_epoch.json";
const CONFIG_FILE: &str = "train_config.json";
const STATS_FILE:  &str = "norm_stats.json";
const EXTENSION:   &str = "mpk";

/// Manages model checkpoints inside one directory.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create the directory if needed and check that it is one.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Self::open(dir)
    }

    /// Use an existing directory, e.g. one written by a previous run.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        ensure!(dir.is_dir(), "Model directory '{}' does not exist", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn epoch_name(epoch: usize) -> String {
        format!("epoch_{epoch}")
    }

    /// Full path of a checkpoint file, extension included.
    pub fn checkpoint_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{EXTENSION}"))
    }

    /// Save the periodic checkpoint of `epoch` and advance the latest pointer.
    pub fn save_epoch<B: Backend, M: Module<B>>(&self, model: &M, epoch: usize) -> Result<PathBuf> {
        let path = self.save_named(model, &Self::epoch_name(epoch))?;

        let latest = self.dir.join(LATEST_FILE);
        fs::write(&latest, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest.display()))?;

        tracing::info!("Saved checkpoint for epoch {}", epoch);
        Ok(path)
    }

    /// Save the best-score checkpoint, replacing the previous best.
    pub fn save_best<B: Backend, M: Module<B>>(&self, model: &M, fscore: f64) -> Result<PathBuf> {
        let path = self.save_named(model, BEST_CHECKPOINT)?;
        tracing::info!("New best fscore {:.4}, saved '{}'", fscore, path.display());
        Ok(path)
    }

    fn save_named<B: Backend, M: Module<B>>(&self, model: &M, name: &str) -> Result<PathBuf> {
        // The recorder appends the extension itself
        let stem = self.dir.join(name);
        model
            .clone()
            .save_file(stem.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;
        Ok(self.checkpoint_path(name))
    }

    /// Load weights from checkpoint `selector` into `model`.
    ///
    /// `selector` is `latest`, `max_fscore` or `epoch_<N>`.
    pub fn load<B: Backend, M: Module<B>>(&self, model: M, selector: &str, device: &B::Device) -> Result<M> {
        let name = self.resolve(selector)?;
        let stem = self.dir.join(&name);

        tracing::info!("Loading checkpoint '{}'", name);
        model
            .load_file(stem.clone(), &CompactRecorder::new(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Has the model been trained?", stem.display())
            })
    }

    /// Map a selector to a checkpoint name.
    pub fn resolve(&self, selector: &str) -> Result<String> {
        match selector {
            LATEST => Ok(Self::epoch_name(self.latest_epoch()?)),
            BEST_CHECKPOINT => Ok(BEST_CHECKPOINT.to_string()),
            other => match other.strip_prefix("epoch_").map(str::parse::<usize>) {
                Some(Ok(epoch)) => Ok(Self::epoch_name(epoch)),
                _ => bail!("Unknown checkpoint '{other}', expected latest, max_fscore or epoch_<N>"),
            },
        }
    }

    /// Epoch number of the newest periodic checkpoint.
    pub fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join(LATEST_FILE);
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }

    /// Save the experiment configuration to JSON.
    pub fn save_config(&self, cfg: &ExperimentConfig) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;

        tracing::debug!("Saved experiment config to '{}'", path.display());
        Ok(())
    }

    /// Load the configuration a previous run was trained with.
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        ExperimentConfig::load(&self.dir.join(CONFIG_FILE))
            .context("Make sure you have run 'train' before 'evaluate'")
    }

    pub fn save_stats(&self, stats: &NormStats) -> Result<()> {
        let path = self.dir.join(STATS_FILE);
        fs::write(&path, serde_json::to_string_pretty(stats)?)
            .with_context(|| format!("Cannot write stats to '{}'", path.display()))
    }

    pub fn load_stats(&self) -> Result<NormStats> {
        let path = self.dir.join(STATS_FILE);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read stats from '{}'", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }
}
