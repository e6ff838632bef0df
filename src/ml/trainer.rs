// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Manual epoch/batch loop using Burn's DataLoader and Adam.
//
// Per epoch:
//   1. Train view with Mode::Train { trans_prob = ramp(epoch) }
//   2. Fresh DataLoader: shuffled (seed + epoch), worker threads
//   3. forward → SegLoss → backward → Adam step, per batch
//   4. `epoch:<i>, loss:<last batch loss>` on stdout + CSV row
//   5. epoch % checkpoint_every == 0 → epoch_<i>.mpk
//   6. eval policy due → Dice scores on full volumes,
//      fscore = 2·whole·core / (whole + core + 0.001),
//      new best → max_fscore.mpk
//
// Key Burn insight:
//   - Training uses TrainBackend (Autodiff<...>) for gradients
//   - model.valid() returns the model on the inner backend,
//     so evaluation records no autodiff graph
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{bail, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::ExperimentConfig;
use crate::data::{batcher::VolumeBatcher, dataset::BratsDataset};
use crate::domain::traits::Mode;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    backend::{select_device, TrainBackend},
    evaluator::{evaluate, RegionScores},
    loss::SegLoss,
    model::{SegmentationNetwork, VoxResNet},
};

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub epochs_run:  usize,
    pub last_loss:   f64,
    pub checkpoints: Vec<usize>,
    pub best_fscore: Option<f64>,
}

/// True when `epoch` gets a periodic checkpoint.
pub fn is_checkpoint_epoch(epoch: usize, every: usize) -> bool {
    every > 0 && epoch % every == 0
}

// ─── Best Score Tracking ──────────────────────────────────────────────────────
/// Running best validation F-score.
///
/// The baseline is 0, so a run whose scores never leave 0 keeps no
/// best checkpoint. Only a strictly higher score replaces the best.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BestTracker {
    best: Option<f64>,
}

impl BestTracker {
    /// Record `fscore`; true when it beats everything seen so far.
    pub fn update(&mut self, fscore: f64) -> bool {
        if fscore > self.best.unwrap_or(0.0) {
            self.best = Some(fscore);
            true
        } else {
            false
        }
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }
}

pub fn run_training(
    cfg:          &ExperimentConfig,
    train:        &BratsDataset,
    val:          &BratsDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
) -> Result<TrainSummary> {
    let device = select_device(&cfg.devices);

    // ── Build model ───────────────────────────────────────────────────────────
    let model: VoxResNet<TrainBackend> = cfg.model.init(&device);
    tracing::info!(
        "Model ready: {} residual blocks, width {}, {} classes",
        cfg.model.num_blocks,
        cfg.model.width,
        cfg.model.num_classes
    );

    train_loop::<TrainBackend, _>(cfg, model, train, val, ckpt_manager, metrics, device)
}

/// Train `model` on `train`, scoring on `val` when the eval policy is due.
pub fn train_loop<B, M>(
    cfg:          &ExperimentConfig,
    mut model:    M,
    train:        &BratsDataset,
    val:          &BratsDataset,
    ckpt_manager: &CheckpointManager,
    metrics:      &MetricsLogger,
    device:       B::Device,
) -> Result<TrainSummary>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SegmentationNetwork<B>,
    M::InnerModule: SegmentationNetwork<B::InnerBackend>,
{
    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new().init::<B, M>();
    let loss_fn   = SegLoss::new(cfg.loss);

    let mut best = BestTracker::default();
    let mut checkpoints = Vec::new();
    let mut last_loss   = f64::NAN;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 0..cfg.num_epochs {
        let trans_prob = cfg.augment.prob_at(epoch);

        // A fresh loader per epoch: the view carries this epoch's trans_prob
        let mut builder = DataLoaderBuilder::new(VolumeBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .shuffle(cfg.seed.wrapping_add(epoch as u64));
        if cfg.num_workers > 0 {
            builder = builder.num_workers(cfg.num_workers);
        }
        let loader = builder.build(train.view(Mode::Train { trans_prob }));

        // ── Training phase ────────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            tracing::debug!(
                "batch volumes {:?} labels {:?}",
                batch.volumes.dims(),
                batch.labels.dims()
            );

            let output = model.forward(batch.volumes);
            let loss   = loss_fn.forward(output, batch.labels);

            last_loss = loss.clone().into_scalar().elem::<f64>();
            loss_sum += last_loss;
            batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads::<B, M>(grads, &model);
            model = optim.step(cfg.learning_rate, model, grads);
        }

        if batches == 0 {
            bail!("Epoch {epoch} produced no batches; is the training split empty?");
        }

        println!("epoch:{}, loss:{}", epoch, last_loss);

        // ── Periodic checkpoint ───────────────────────────────────────────────
        if is_checkpoint_epoch(epoch, cfg.checkpoint_every) {
            ckpt_manager.save_epoch::<B, _>(&model, epoch)?;
            checkpoints.push(epoch);
        }

        // ── Periodic evaluation ───────────────────────────────────────────────
        let mut val_scores: Option<RegionScores> = None;
        if cfg.eval.is_due(epoch) {
            let model_valid = model.valid();
            let chunk_size  = cfg.chunk_size;

            if cfg.eval.on_train {
                tracing::info!("Evaluating training subjects at epoch {}", epoch);
                let train_view = train.view(Mode::Eval);
                evaluate::<B::InnerBackend, _>(&model_valid, &train_view, chunk_size, &device)?;
            }

            tracing::info!("Evaluating validation subjects at epoch {}", epoch);
            let val_view = val.view(Mode::Eval);
            let scores   = evaluate::<B::InnerBackend, _>(&model_valid, &val_view, chunk_size, &device)?;
            let fscore   = scores.fscore();
            tracing::info!("epoch {} fscore {:.4}", epoch, fscore);

            if best.update(fscore) {
                ckpt_manager.save_best::<B, _>(&model, fscore)?;
            }
            val_scores = Some(scores);
        }

        metrics.log(&EpochMetrics {
            epoch,
            trans_prob,
            batches,
            last_loss,
            mean_loss: loss_sum / batches as f64,
            val: val_scores,
        })?;
    }

    tracing::info!("Training complete!");
    Ok(TrainSummary {
        epochs_run: cfg.num_epochs,
        last_loss,
        checkpoints,
        best_fscore: best.best(),
    })
}
