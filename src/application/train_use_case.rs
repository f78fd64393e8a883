// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one fold's training run in order:
//
//   Step 1: Prepare the model directory   (Layer 6 - infra)
//   Step 2: --clean old fold artefacts     (Layer 6 - infra)
//   Step 3: Save config                    (Layer 6 - infra)
//   Step 4: Read ids from train.csv        (Layer 4 - data)
//   Step 5: Split train/validation         (Layer 3 - domain)
//   Step 6: Build datasets + loader        (Layer 4 - data)
//   Step 7: Install the Ctrl-C hook        (Layer 6 - infra)
//   Step 8: Run training on the device     (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray, Wgpu},
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, sync::Arc};

use crate::data::{
    dataset::SegDataset,
    loader::{CsvIdSource, SampleStore},
    prefetch::PrefetchLoader,
};
use crate::domain::{cancel::CancellationToken, fold::FoldSplit, traits::IdSource};
use crate::infra::{checkpoint::CheckpointStore, device::DeviceContext, interrupt::install_ctrl_c};
use crate::ml::{
    loss::SegmentationLoss,
    lr_schedule::CyclicLr,
    model::UNet11Config,
    trainer::{TrainReport, Trainer, TrainerSettings},
};

type CpuBackend = Autodiff<NdArray>;
type GpuBackend = Autodiff<Wgpu>;

// ─── Input Size Tag ──────────────────────────────────────────────────────────
/// `HEIGHTxWIDTH`, e.g. `101x101`. Recorded with the run configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub height: u32,
    pub width:  u32,
}

impl Default for InputSize {
    fn default() -> Self {
        Self { height: 101, width: 101 }
    }
}

impl FromStr for InputSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (h, w) = s
            .split_once(['x', 'X'])
            .with_context(|| format!("Malformed size '{s}', expected HEIGHTxWIDTH"))?;
        let height: u32 = h.trim().parse().with_context(|| format!("Malformed height in '{s}'"))?;
        let width:  u32 = w.trim().parse().with_context(|| format!("Malformed width in '{s}'"))?;
        if height == 0 || width == 0 {
            bail!("Size '{s}' must be positive");
        }
        Ok(Self { height, width })
    }
}

impl fmt::Display for InputSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Serialisable so it can be saved next
// to the checkpoints and reloaded for prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_root:   PathBuf,
    pub models_dir:  PathBuf,
    pub model_name:  String,
    pub batch_size:  usize,
    pub n_epochs:    usize,
    pub lr:          f64,
    pub workers:     usize,
    pub clean:       bool,
    pub epoch_size:  Option<usize>,
    pub fold:        usize,
    pub device:      DeviceContext,
    pub size:        InputSize,
    pub dice_weight: f64,
    pub seed:        u64,
    pub model:       UNet11Config,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_root:   PathBuf::from("data"),
            models_dir:  PathBuf::from("models"),
            model_name:  "unet_11".to_string(),
            batch_size:  24,
            n_epochs:    100,
            lr:          1e-4,
            workers:     8,
            clean:       false,
            epoch_size:  None,
            fold:        0,
            device:      DeviceContext::default(),
            size:        InputSize::default(),
            dice_weight: 0.0,
            seed:        42,
            model:       UNet11Config::new(),
        }
    }
}

impl TrainConfig {
    pub fn model_dir(&self) -> PathBuf {
        self.models_dir.join(&self.model_name)
    }

    fn trainer_settings(&self) -> TrainerSettings {
        TrainerSettings {
            n_epochs:   self.n_epochs,
            batch_size: self.batch_size,
            epoch_size: self.epoch_size,
            seed:       self.seed,
            schedule:   CyclicLr::with_init_lr(self.lr),
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run with a Ctrl-C hook wired to the training loop.
    pub fn execute(&self) -> Result<TrainReport> {
        let cancel = CancellationToken::new();
        install_ctrl_c(cancel.clone())?;
        self.execute_with(cancel)
    }

    /// Run with an externally controlled cancellation token.
    pub fn execute_with(&self, cancel: CancellationToken) -> Result<TrainReport> {
        let cfg = &self.config;
        if cfg.batch_size == 0 {
            bail!("Batch size must be positive");
        }

        // ── Step 1-3: model directory, --clean, config ───────────────────────
        let store = CheckpointStore::new(cfg.model_dir(), cfg.fold)?;
        if cfg.clean {
            store.clean()?;
        }
        store.save_config(cfg)?;

        // ── Step 4-5: ids and fold split ──────────────────────────────────────
        let ids = CsvIdSource::new(cfg.data_root.join("train.csv")).load_ids()?;
        let split = FoldSplit::from(ids.as_slice());
        tracing::info!(
            "Fold {}: {} train, {} validation (size tag {})",
            cfg.fold,
            split.train.len(),
            split.valid.len(),
            cfg.size,
        );

        // ── Step 6: datasets and loader ───────────────────────────────────────
        let train_root = cfg.data_root.join("train");
        let train = Arc::new(
            SegDataset::new(SampleStore::train(&train_root), split.train).with_augmentation(cfg.seed),
        );
        let valid = Arc::new(SegDataset::new(SampleStore::train(&train_root), split.valid));
        let loader = PrefetchLoader::new(cfg.workers, cfg.batch_size)?;

        // ── Step 7-8: run on the resolved device ──────────────────────────────
        tracing::info!("Training on {}", cfg.device);
        let report = match cfg.device.primary_gpu() {
            None => self.run::<CpuBackend>(NdArrayDevice::Cpu, store, cancel, train, valid, &loader)?,
            Some(index) => {
                let device = DeviceContext::wgpu_device(index);
                self.run::<GpuBackend>(device, store, cancel, train, valid, &loader)?
            }
        };

        tracing::info!(
            "Finished with {:?} at epoch {}, step {}",
            report.outcome,
            report.progress.epoch,
            report.progress.step,
        );
        Ok(report)
    }

    fn run<B: AutodiffBackend>(
        &self,
        device: B::Device,
        store:  CheckpointStore,
        cancel: CancellationToken,
        train:  Arc<SegDataset<SampleStore>>,
        valid:  Arc<SegDataset<SampleStore>>,
        loader: &PrefetchLoader,
    ) -> Result<TrainReport> {
        let cfg = &self.config;
        let model = cfg.model.init::<B>(&device);
        let trainer = Trainer::<B>::new(
            cfg.trainer_settings(),
            SegmentationLoss::new(cfg.dice_weight),
            store,
            cancel,
            device,
        );
        trainer.run(model, train, valid, loader)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::trainer::TrainOutcome;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use std::{fs, path::Path};

    fn write_dataset(root: &Path, n: usize) {
        fs::create_dir_all(root.join("train/images")).unwrap();
        fs::create_dir_all(root.join("train/masks")).unwrap();
        let mut csv = String::from("id,z\n");
        for i in 0..n {
            let id = format!("s{i}");
            RgbImage::from_fn(20, 20, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, i as u8]))
                .save(root.join(format!("train/images/{id}.png")))
                .unwrap();
            GrayImage::from_fn(20, 20, |x, _| Luma([if x < 10 { 255 } else { 0 }]))
                .save(root.join(format!("train/masks/{id}.png")))
                .unwrap();
            csv.push_str(&format!("{id},{i}\n"));
        }
        fs::write(root.join("train.csv"), csv).unwrap();
    }

    fn config(root: &Path) -> TrainConfig {
        TrainConfig {
            data_root:  root.join("data"),
            models_dir: root.join("models"),
            batch_size: 2,
            n_epochs:   1,
            workers:    2,
            device:     DeviceContext::Cpu,
            model:      UNet11Config::new().with_encoder_width(2).with_num_filters(2),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_size_parsing() {
        assert_eq!("101x101".parse::<InputSize>().unwrap(), InputSize::default());
        assert_eq!("288X384".parse::<InputSize>().unwrap(), InputSize { height: 288, width: 384 });
        for bad in ["101", "x101", "101x", "0x5", "axb"] {
            assert!(bad.parse::<InputSize>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_end_to_end_on_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_dataset(&cfg.data_root, 12);

        let report = TrainUseCase::new(cfg.clone()).execute_with(CancellationToken::new()).unwrap();
        assert_eq!(report.outcome, TrainOutcome::Done);
        // 12 ids → 10 train → 5 batches
        assert_eq!(report.progress.step, 5);

        let model_dir = cfg.model_dir();
        assert!(model_dir.join("model_0.mpk.gz").exists());
        assert!(model_dir.join("best-model_0.mpk.gz").exists());
        assert!(model_dir.join("train_0.log").exists());

        let saved: TrainConfig = CheckpointStore::new(&model_dir, 0).unwrap().load_config().unwrap();
        assert_eq!(saved.model.num_filters, 2);
    }

    #[test]
    fn test_clean_starts_over() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        write_dataset(&cfg.data_root, 12);

        TrainUseCase::new(cfg.clone()).execute_with(CancellationToken::new()).unwrap();
        let resumed = TrainUseCase::new(TrainConfig { n_epochs: 2, ..cfg.clone() })
            .execute_with(CancellationToken::new())
            .unwrap();
        assert_eq!(resumed.progress.step, 10);

        let cleaned = TrainUseCase::new(TrainConfig { clean: true, ..cfg })
            .execute_with(CancellationToken::new())
            .unwrap();
        assert_eq!(cleaned.progress.step, 5);
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        assert!(TrainUseCase::new(cfg).execute_with(CancellationToken::new()).is_err());
    }
}
