// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `predict` and `merge`
// and all their configurable flags.
//
// --device-ids and --size are parsed by clap through FromStr, so
// a malformed value stops the program before any work starts.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::{
    merge_use_case::MergeConfig,
    predict_use_case::PredictConfig,
    train_use_case::{InputSize, TrainConfig},
};
use crate::infra::device::DeviceContext;
use crate::ml::model::UNet11Config;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train one cross-validation fold
    Train(TrainArgs),

    /// Predict test masks with a trained fold
    Predict(PredictArgs),

    /// Average the per-fold test predictions
    Merge(MergeArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Directory holding train.csv, train/ and test/
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    /// Checkpoints and logs go to <models-dir>/<model-name>/
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    #[arg(long, default_value = "unet_11")]
    pub model_name: String,

    #[arg(long, default_value_t = 24)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100)]
    pub n_epochs: usize,

    /// Initial learning rate of every cycle
    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// Data loading threads
    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    /// Remove this fold's checkpoints and log before training
    #[arg(long)]
    pub clean: bool,

    /// Samples per epoch; defaults to the whole training split
    #[arg(long)]
    pub epoch_size: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub fold: usize,

    /// `cpu`, or GPU indices such as `0` or `0,1`
    #[arg(long, default_value = "0")]
    pub device_ids: DeviceContext,

    /// Input size tag, HEIGHTxWIDTH
    #[arg(long, default_value = "101x101")]
    pub size: InputSize,

    /// Weight of the Jaccard term in the loss
    #[arg(long, default_value_t = 0.0)]
    pub dice_weight: f64,

    /// Seed for shuffling and augmentation
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// This is the boundary between Layer 1 and Layer 2;
/// the application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_root:   a.data_root,
            models_dir:  a.models_dir,
            model_name:  a.model_name,
            batch_size:  a.batch_size,
            n_epochs:    a.n_epochs,
            lr:          a.lr,
            workers:     a.workers,
            clean:       a.clean,
            epoch_size:  a.epoch_size,
            fold:        a.fold,
            device:      a.device_ids,
            size:        a.size,
            dice_weight: a.dice_weight,
            seed:        a.seed,
            model:       UNet11Config::new(),
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[arg(long, default_value = "data")]
    pub data_root: PathBuf,

    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    #[arg(long, default_value = "unet_11")]
    pub model_name: String,

    #[arg(long, default_value_t = 0)]
    pub fold: usize,

    #[arg(long, default_value_t = 24)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 8)]
    pub workers: usize,

    #[arg(long, default_value = "0")]
    pub device_ids: DeviceContext,
}

impl From<PredictArgs> for PredictConfig {
    fn from(a: PredictArgs) -> Self {
        PredictConfig {
            data_root:  a.data_root,
            models_dir: a.models_dir,
            model_name: a.model_name,
            fold:       a.fold,
            batch_size: a.batch_size,
            workers:    a.workers,
            device:     a.device_ids,
        }
    }
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[arg(long, default_value = "models")]
    pub models_dir: PathBuf,

    /// Merged masks go to <subm-dir>/<model-name>/test_averaged/
    #[arg(long, default_value = "submissions")]
    pub subm_dir: PathBuf,

    #[arg(long, default_value = "unet_11")]
    pub model_name: String,

    #[arg(long, default_value_t = 5)]
    pub num_folds: usize,

    #[arg(long, default_value_t = 16)]
    pub workers: usize,
}

impl From<MergeArgs> for MergeConfig {
    fn from(a: MergeArgs) -> Self {
        MergeConfig {
            models_dir: a.models_dir,
            subm_dir:   a.subm_dir,
            model_name: a.model_name,
            num_folds:  a.num_folds,
            workers:    a.workers,
        }
    }
}
