// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Saves and restores one fold's training state with Burn's
// NamedMpkGzFileRecorder (full precision, MessagePack + gzip).
//
// What gets saved per checkpoint (one record):
//   1. Model weights
//   2. epoch            — the next epoch to run
//   3. step             — global optimiser step counter
//   4. best_valid_loss  — lowest validation loss observed so far
//
// File naming convention:
//   <models_dir>/<model>/
//     model_<fold>.mpk.gz        ← overwritten every epoch
//     best-model_<fold>.mpk.gz   ← copy of the best epoch so far
//     train_<fold>.log           ← JSON-lines event log
//     train_config.json          ← run configuration
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Record, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::PathBuf};

use crate::domain::progress::TrainingProgress;
use crate::ml::model::{UNet11, UNet11Record};

type CheckpointRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

const EXTENSION: &str = "mpk.gz";
const CONFIG_FILE: &str = "train_config.json";

#[derive(Record)]
pub struct CheckpointRecord<B: Backend> {
    pub model:           UNet11Record<B>,
    pub epoch:           usize,
    pub step:            usize,
    pub best_valid_loss: f64,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir:  PathBuf,
    fold: usize,
}

impl CheckpointStore {
    /// Creates the model directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>, fold: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(Self { dir, fold })
    }

    // Recorder paths carry no extension; the recorder appends it.
    fn model_stem(&self) -> PathBuf {
        self.dir.join(format!("model_{}", self.fold))
    }

    fn best_stem(&self) -> PathBuf {
        self.dir.join(format!("best-model_{}", self.fold))
    }

    pub fn model_file(&self) -> PathBuf {
        self.model_stem().with_extension(EXTENSION)
    }

    pub fn best_file(&self) -> PathBuf {
        self.best_stem().with_extension(EXTENSION)
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.join(format!("train_{}.log", self.fold))
    }

    pub fn exists(&self) -> bool {
        self.model_file().exists()
    }

    /// Overwrite the fold's checkpoint with `model` and `progress`.
    pub fn save<B: Backend>(&self, model: &UNet11<B>, progress: TrainingProgress) -> Result<()> {
        let record = CheckpointRecord {
            model:           model.clone().into_record(),
            epoch:           progress.epoch,
            step:            progress.step,
            best_valid_loss: progress.best_valid_loss,
        };
        let path = self.model_stem();
        CheckpointRecorder::new()
            .record(record, path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}, step {}", progress.epoch, progress.step);
        Ok(())
    }

    /// Restore the fold's checkpoint into `model`. Without a checkpoint the
    /// model comes back untouched with `None` progress.
    pub fn try_load<B: Backend>(
        &self,
        model:  UNet11<B>,
        device: &B::Device,
    ) -> Result<(UNet11<B>, Option<TrainingProgress>)> {
        if !self.exists() {
            return Ok((model, None));
        }
        let (model, progress) = load_from(self.model_stem(), model, device)?;
        Ok((model, Some(progress)))
    }

    /// Weights for inference: the best checkpoint, else the latest one.
    pub fn load_for_inference<B: Backend>(
        &self,
        model:  UNet11<B>,
        device: &B::Device,
    ) -> Result<(UNet11<B>, TrainingProgress)> {
        let stem = if self.best_file().exists() {
            self.best_stem()
        } else {
            tracing::warn!(
                "No best checkpoint for fold {}, falling back to '{}'",
                self.fold,
                self.model_file().display()
            );
            self.model_stem()
        };
        load_from(stem, model, device)
    }

    /// Copy the current checkpoint file over the best one.
    pub fn copy_to_best(&self) -> Result<()> {
        let (from, to) = (self.model_file(), self.best_file());
        fs::copy(&from, &to)
            .with_context(|| format!("Cannot copy '{}' to '{}'", from.display(), to.display()))?;
        Ok(())
    }

    /// Remove checkpoint, best checkpoint and event log for this fold.
    pub fn clean(&self) -> Result<()> {
        for path in [self.model_file(), self.best_file(), self.log_file()] {
            if path.exists() {
                fs::remove_file(&path)
                    .with_context(|| format!("Cannot remove '{}'", path.display()))?;
                tracing::info!("Removed '{}'", path.display());
            }
        }
        Ok(())
    }

    /// Save the run configuration next to the checkpoints.
    pub fn save_config<T: Serialize>(&self, cfg: &T) -> Result<()> {
        let path = self.dir.join(CONFIG_FILE);
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config<T: DeserializeOwned>(&self) -> Result<T> {
        let path = self.dir.join(CONFIG_FILE);
        let json = fs::read_to_string(&path).with_context(|| {
            format!("Cannot read config from '{}'. Has this model been trained?", path.display())
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config in '{}'", path.display()))
    }
}

fn load_from<B: Backend>(
    stem:   PathBuf,
    model:  UNet11<B>,
    device: &B::Device,
) -> Result<(UNet11<B>, TrainingProgress)> {
    let record: CheckpointRecord<B> = CheckpointRecorder::new()
        .load(stem.clone(), device)
        .with_context(|| format!("Cannot load checkpoint '{}'", stem.display()))?;

    let progress = TrainingProgress {
        epoch:           record.epoch,
        step:            record.step,
        best_valid_loss: record.best_valid_loss,
    };
    Ok((model.load_record(record.model), progress))
}
