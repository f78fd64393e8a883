// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Writes one probability mask per test image for a single fold:
//
//   <data_root>/test/images/<id>.png
//       → <models_dir>/<model>/<fold>/test/<id>.png
//
// The model architecture comes from the train_config.json saved by
// the training run; the weights from the fold's best checkpoint.

use anyhow::Result;
use burn::{
    backend::{ndarray::NdArrayDevice, NdArray, Wgpu},
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, sync::Arc};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    dataset::SegDataset,
    image_io::save_gray,
    loader::{DirIdSource, SampleStore},
    prefetch::PrefetchLoader,
};
use crate::domain::traits::IdSource;
use crate::infra::{checkpoint::CheckpointStore, device::DeviceContext};
use crate::ml::predictor::Predictor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictConfig {
    pub data_root:  PathBuf,
    pub models_dir: PathBuf,
    pub model_name: String,
    pub fold:       usize,
    pub batch_size: usize,
    pub workers:    usize,
    pub device:     DeviceContext,
}

impl PredictConfig {
    pub fn model_dir(&self) -> PathBuf {
        self.models_dir.join(&self.model_name)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.model_dir().join(self.fold.to_string()).join("test")
    }
}

pub struct PredictUseCase {
    config: PredictConfig,
}

impl PredictUseCase {
    pub fn new(config: PredictConfig) -> Self {
        Self { config }
    }

    /// Returns the number of masks written.
    pub fn execute(&self) -> Result<usize> {
        match self.config.device.primary_gpu() {
            None => self.run::<NdArray>(NdArrayDevice::Cpu),
            Some(index) => self.run::<Wgpu>(DeviceContext::wgpu_device(index)),
        }
    }

    fn run<B: Backend>(&self, device: B::Device) -> Result<usize> {
        let cfg = &self.config;
        let store = CheckpointStore::new(cfg.model_dir(), cfg.fold)?;
        let train_cfg: TrainConfig = store.load_config()?;

        let model = train_cfg.model.init::<B>(&device);
        let (model, progress) = store.load_for_inference(model, &device)?;
        tracing::info!(
            "Loaded fold {} weights (epoch {}, best valid loss {:.5})",
            cfg.fold,
            progress.epoch,
            progress.best_valid_loss,
        );

        let test_root = cfg.data_root.join("test");
        let ids = DirIdSource::new(test_root.join("images")).load_ids()?;
        tracing::info!("Predicting {} test images", ids.len());

        let dataset = Arc::new(SegDataset::new(SampleStore::test(&test_root), ids));
        let loader = PrefetchLoader::new(cfg.workers, cfg.batch_size)?;
        let out_dir = cfg.output_dir();

        let written = Predictor::new(model, device).predict(dataset, &loader, |id, mask| {
            save_gray(&mask, &out_dir.join(format!("{id}.png")))
        })?;

        tracing::info!("Wrote {} masks to '{}'", written, out_dir.display());
        Ok(written)
    }
}
