// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — trains one fold, resuming if a checkpoint exists
//   2. `predict` — writes a fold's test masks
//   3. `merge`   — averages the folds' test masks
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, MergeArgs, PredictArgs, TrainArgs};

use crate::application::{
    merge_use_case::MergeUseCase,
    predict_use_case::PredictUseCase,
    train_use_case::TrainUseCase,
};
use crate::ml::trainer::TrainOutcome;

#[derive(Parser, Debug)]
#[command(
    name = "tgs-unet",
    version = "0.1.0",
    about = "Train a UNet11 salt segmentation model per fold, predict, and merge folds."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Merge(args)   => run_merge(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Training fold {} on data in '{}'", args.fold, args.data_root.display());

    let report = TrainUseCase::new(args.into()).execute()?;
    match report.outcome {
        TrainOutcome::Done => println!(
            "Training complete. Best valid loss {:.5}.",
            report.progress.best_valid_loss
        ),
        TrainOutcome::Interrupted => println!(
            "Interrupted. Snapshot saved at epoch {}, step {}.",
            report.progress.epoch, report.progress.step
        ),
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let written = PredictUseCase::new(args.into()).execute()?;
    println!("Wrote {written} test masks.");
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<()> {
    let merged = MergeUseCase::new(args.into()).execute()?;
    println!("Merged {merged} test masks.");
    Ok(())
}
