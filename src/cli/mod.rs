// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Two commands are supported:
//   1. `train`    — trains the network, writing checkpoints
//   2. `evaluate` — scores a saved checkpoint on one split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

use crate::application::train_use_case::ExperimentConfig;

/// The main CLI struct. Clap reads the fields and generates
/// argument parsing code automatically via the Parser derive macro.
#[derive(Parser, Debug)]
#[command(
    name = "brats-seg",
    version,
    about = "Train a 3-D tumour segmentation network on BRATS MRI volumes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(mut args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let base = match args.config.take() {
        Some(path) => {
            tracing::info!("Loading experiment config from {}", path.display());
            ExperimentConfig::load(&path)?
        }
        None => ExperimentConfig::default(),
    };
    let cfg = args.apply(base);
    tracing::info!("Training on subjects in: {}", cfg.data_root.display());

    let summary = TrainUseCase::new(cfg).execute()?;

    println!(
        "Training complete: {} epochs, {} checkpoints saved.",
        summary.epochs_run,
        summary.checkpoints.len()
    );
    if let Some(best) = summary.best_fscore {
        println!("Best validation fscore: {best:.4}");
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let split    = args.split.into();
    let use_case = EvaluateUseCase::new(args.model_dir, args.checkpoint, split);
    let scores   = use_case.execute()?;

    println!(
        "whole: {:.4}  core: {:.4}  enhancing: {:.4}  fscore: {:.4}",
        scores.whole,
        scores.core,
        scores.enhancing,
        scores.fscore()
    );
    Ok(())
}
