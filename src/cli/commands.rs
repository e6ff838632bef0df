// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their configurable flags.
//
// Every `train` flag is optional: an unset flag keeps the value
// of the base configuration, which is either the built-in
// defaults or the JSON file given with --config.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::application::{
    evaluate_use_case::EvalSplit,
    train_use_case::ExperimentConfig,
};
use crate::ml::loss::LossKind;

/// Focal loss gamma when `--loss focal` is given without `--focal-gamma`.
pub const DEFAULT_FOCAL_GAMMA: f64 = 2.0;

/// The two top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the segmentation network on BRATS subjects
    Train(TrainArgs),

    /// Score a saved checkpoint with per-region Dice
    Evaluate(EvaluateArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossArg {
    CrossEntropy,
    Focal,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON experiment config; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory holding the HGG/ and LGG/ subject folders
    #[arg(long)]
    pub data_root: Option<PathBuf>,

    /// Directory for checkpoints, config and metrics
    #[arg(long)]
    pub model_dir: Option<PathBuf>,

    /// Number of HGG subjects used for training
    #[arg(long)]
    pub hgg_train: Option<usize>,

    /// Number of LGG subjects used for training
    #[arg(long)]
    pub lgg_train: Option<usize>,

    /// Training crop as X Y Z
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
    pub sample_shape: Option<Vec<usize>>,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    /// DataLoader worker threads (0 = load on the training thread)
    #[arg(long)]
    pub num_workers: Option<usize>,

    #[arg(long)]
    pub lr: Option<f64>,

    #[arg(long)]
    pub seed: Option<u64>,

    /// Save epoch_<N> every this many epochs
    #[arg(long)]
    pub checkpoint_every: Option<usize>,

    /// Slices per forward pass during evaluation
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Evaluate every this many epochs (off unless set)
    #[arg(long)]
    pub eval_every: Option<usize>,

    /// Skip scoring the training subjects during evaluation
    #[arg(long)]
    pub no_eval_train: bool,

    #[arg(long, value_enum)]
    pub loss: Option<LossArg>,

    /// Focusing parameter of the focal loss (default 2.0)
    #[arg(long)]
    pub focal_gamma: Option<f64>,

    /// Device indices; training runs on the first
    #[arg(long, value_delimiter = ',')]
    pub devices: Option<Vec<usize>>,
}

impl TrainArgs {
    /// Apply every flag that was given on top of `base`.
    pub fn apply(self, mut base: ExperimentConfig) -> ExperimentConfig {
        if let Some(v) = self.data_root        { base.data_root = v; }
        if let Some(v) = self.model_dir        { base.model_dir = v; }
        if let Some(v) = self.hgg_train        { base.split.hgg = v; }
        if let Some(v) = self.lgg_train        { base.split.lgg = v; }
        if let Some(v) = self.epochs           { base.num_epochs = v; }
        if let Some(v) = self.batch_size       { base.batch_size = v; }
        if let Some(v) = self.num_workers      { base.num_workers = v; }
        if let Some(v) = self.lr               { base.learning_rate = v; }
        if let Some(v) = self.seed             { base.seed = v; }
        if let Some(v) = self.checkpoint_every { base.checkpoint_every = v; }
        if let Some(v) = self.chunk_size       { base.chunk_size = v; }
        if let Some(v) = self.devices          { base.devices = v; }
        if let Some(v) = self.eval_every       { base.eval.every = Some(v); }
        if self.no_eval_train                  { base.eval.on_train = false; }

        if let Some([x, y, z]) = self.sample_shape.as_deref().and_then(|s| <[usize; 3]>::try_from(s).ok()) {
            base.sample_shape = [x, y, z];
        }
        base.loss = match (self.loss, base.loss) {
            (Some(LossArg::CrossEntropy), _)                 => LossKind::CrossEntropy,
            (Some(LossArg::Focal), LossKind::Focal { gamma }) => LossKind::Focal { gamma },
            (Some(LossArg::Focal), _)                        => LossKind::Focal { gamma: DEFAULT_FOCAL_GAMMA },
            (None, kind)                                     => kind,
        };
        if let Some(g) = self.focal_gamma {
            match &mut base.loss {
                LossKind::Focal { gamma } => *gamma = g,
                LossKind::CrossEntropy => {
                    tracing::warn!("--focal-gamma {} has no effect with the cross-entropy loss", g);
                }
            }
        }
        base
    }
}

/// Convert CLI TrainArgs into the application-layer ExperimentConfig.
/// This is the boundary between Layer 1 and Layer 2;
/// the application layer never sees clap types.
impl From<TrainArgs> for ExperimentConfig {
    fn from(a: TrainArgs) -> Self {
        a.apply(ExperimentConfig::default())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitArg {
    Train,
    Val,
}

impl From<SplitArg> for EvalSplit {
    fn from(s: SplitArg) -> Self {
        match s {
            SplitArg::Train => EvalSplit::Train,
            SplitArg::Val   => EvalSplit::Val,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory a previous `train` run wrote to
    #[arg(long, default_value = "model")]
    pub model_dir: PathBuf,

    /// latest, max_fscore or epoch_<N>
    #[arg(long, default_value = "latest")]
    pub checkpoint: String,

    #[arg(long, value_enum, default_value_t = SplitArg::Val)]
    pub split: SplitArg,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::Cli;
    use crate::data::splitter::SplitCounts;

    fn train_args(argv: &[&str]) -> TrainArgs {
        let mut full = vec!["brats-seg", "train"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Commands::Train(args) => args,
            other => panic!("expected train, got {other:?}"),
        }
    }

    #[test]
    fn test_no_flags_keeps_defaults() {
        let cfg: ExperimentConfig = train_args(&[]).into();
        let def = ExperimentConfig::default();
        assert_eq!(cfg.num_epochs, def.num_epochs);
        assert_eq!(cfg.split, def.split);
        assert_eq!(cfg.loss, LossKind::CrossEntropy);
        assert_eq!(cfg.eval, def.eval);
    }

    #[test]
    fn test_flags_override() {
        let cfg: ExperimentConfig = train_args(&[
            "--epochs", "10",
            "--hgg-train", "2",
            "--lgg-train", "1",
            "--sample-shape", "64", "64", "8",
            "--eval-every", "20",
            "--no-eval-train",
            "--loss", "focal",
            "--devices", "1,2",
        ])
        .into();
        assert_eq!(cfg.num_epochs, 10);
        assert_eq!(cfg.split, SplitCounts { hgg: 2, lgg: 1 });
        assert_eq!(cfg.sample_shape, [64, 64, 8]);
        assert_eq!(cfg.eval.every, Some(20));
        assert!(!cfg.eval.on_train);
        assert_eq!(cfg.loss, LossKind::Focal { gamma: 2.0 });
        assert_eq!(cfg.devices, vec![1, 2]);
    }

    #[test]
    fn test_flags_override_file_base() {
        let base = ExperimentConfig { num_epochs: 99, batch_size: 3, ..ExperimentConfig::default() };
        let cfg  = train_args(&["--batch-size", "5"]).apply(base);
        assert_eq!(cfg.num_epochs, 99);
        assert_eq!(cfg.batch_size, 5);
    }

    #[test]
    fn test_focal_gamma_with_focal_loss() {
        let cfg: ExperimentConfig = train_args(&["--loss", "focal", "--focal-gamma", "0.5"]).into();
        assert_eq!(cfg.loss, LossKind::Focal { gamma: 0.5 });
    }

    #[test]
    fn test_focal_gamma_overrides_file_focal_loss() {
        let base = ExperimentConfig { loss: LossKind::Focal { gamma: 1.0 }, ..ExperimentConfig::default() };
        assert_eq!(train_args(&["--focal-gamma", "3"]).apply(base.clone()).loss, LossKind::Focal { gamma: 3.0 });
        // --loss focal alone keeps the file's gamma
        assert_eq!(train_args(&["--loss", "focal"]).apply(base).loss, LossKind::Focal { gamma: 1.0 });
    }

    #[test]
    fn test_focal_gamma_without_focal_loss_leaves_cross_entropy() {
        let cfg: ExperimentConfig = train_args(&["--focal-gamma", "3"]).into();
        assert_eq!(cfg.loss, LossKind::CrossEntropy);
    }

    #[test]
    fn test_evaluate_defaults() {
        match Cli::parse_from(["brats-seg", "evaluate"]).command {
            Commands::Evaluate(args) => {
                assert_eq!(args.model_dir, PathBuf::from("model"));
                assert_eq!(args.checkpoint, "latest");
                assert_eq!(EvalSplit::from(args.split), EvalSplit::Val);
            }
            other => panic!("expected evaluate, got {other:?}"),
        }
    }
}
