// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Scores a saved checkpoint on one split of the data:
//
//   Step 1: Load train_config.json + norm_stats.json  (Layer 6)
//   Step 2: Rediscover and split subjects             (Layer 4)
//   Step 3: Load the chosen split with training stats (Layer 4)
//   Step 4: Rebuild the network, load the weights     (Layer 5/6)
//   Step 5: Region Dice scores on full volumes        (Layer 5)
//
// The split is recomputed from the saved config, so it matches
// the one the checkpoint was trained with as long as the data
// directory has not changed.

use anyhow::{Context, Result};
use burn::prelude::*;
use std::path::PathBuf;

use crate::application::train_use_case::TrainUseCase;
use crate::data::{dataset::BratsDataset, loader::NiftiReader};
use crate::domain::traits::{Mode, VolumeReader};
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{select_device, InferenceBackend},
    evaluator::{evaluate, RegionScores},
    model::VoxResNet,
};

/// Which subjects to score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalSplit {
    Train,
    Val,
}

pub struct EvaluateUseCase {
    model_dir:  PathBuf,
    checkpoint: String,
    split:      EvalSplit,
}

impl EvaluateUseCase {
    pub fn new(model_dir: impl Into<PathBuf>, checkpoint: impl Into<String>, split: EvalSplit) -> Self {
        Self { model_dir: model_dir.into(), checkpoint: checkpoint.into(), split }
    }

    pub fn execute(&self) -> Result<RegionScores> {
        let ckpt   = CheckpointManager::open(&self.model_dir)?;
        let cfg    = ckpt.load_config()?;
        let device = select_device(&cfg.devices);
        self.evaluate_on::<InferenceBackend>(&NiftiReader::new(), &device)
    }

    /// Run the evaluation on backend `B`, reading subjects with `reader`.
    pub fn evaluate_on<B: Backend>(&self, reader: &dyn VolumeReader, device: &B::Device) -> Result<RegionScores> {
        // ── Step 1: Saved run state ───────────────────────────────────────────
        let ckpt  = CheckpointManager::open(&self.model_dir)?;
        let cfg   = ckpt.load_config()?;
        let stats = ckpt.load_stats()?;

        // ── Steps 2-3: Subjects of the requested split ────────────────────────
        let split   = TrainUseCase::new(cfg.clone()).discover_split()?;
        let folders = match self.split {
            EvalSplit::Train => &split.train,
            EvalSplit::Val   => &split.val,
        };
        let dataset = BratsDataset::with_stats(folders, reader, stats, cfg.sample_shape)
            .with_context(|| format!("Building {:?} dataset", self.split))?;
        tracing::info!("Evaluating {} {:?} subjects", dataset.len(), self.split);

        // ── Step 4: Network and weights ───────────────────────────────────────
        let model: VoxResNet<B> = cfg.model.init(device);
        let model = ckpt.load(model, &self.checkpoint, device)?;

        // ── Step 5: Scores ────────────────────────────────────────────────────
        evaluate::<B, _>(&model, &dataset.view(Mode::Eval), cfg.chunk_size, device)
    }
}
