// ============================================================
// Layer 5 — Training Loop
// ============================================================
// One fold, resumable, interruptible.
//
//   FRESH    no checkpoint  → epoch 1, step 0, best = +inf
//   RESUMED  checkpoint     → epoch, step, best and weights restored
//
//   for epoch in start..=n_epochs:
//     lr ← cyclic schedule(epoch); fresh Adam (no carried state)
//     for each batch (capped by epoch_size / batch_size):
//       cancelled?  → save(epoch), INTERRUPTED
//       step += 1; backward(batch_size * loss); optimiser step
//       every 10th batch → event {step, loss}
//     event {step, loss}
//     save(epoch + 1)
//     validate → event {step, valid_loss, dice_loss}
//     strictly better? → best ← valid_loss, save, copy to best file
//     cancelled?  → save(epoch + 1), INTERRUPTED
//   DONE
//
// Key Burn insight:
//   - Training uses B (an AutodiffBackend) for gradients
//   - model.valid() returns the model on B::InnerBackend, which
//     shares B's device type, so validation needs no extra device
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::Result;
use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::data::{
    batcher::SegBatcher,
    dataset::SegDataset,
    prefetch::{epoch_order, PrefetchLoader},
};
use crate::domain::{cancel::CancellationToken, progress::TrainingProgress, traits::SampleSource};
use crate::infra::{checkpoint::CheckpointStore, event_log::EventLog};
use crate::ml::{
    loss::SegmentationLoss,
    lr_schedule::CyclicLr,
    model::UNet11,
    validation::{validate, ValidationMetrics},
};

/// Batches between running-loss events, and the trailing window size.
const REPORT_EACH: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerSettings {
    pub n_epochs:   usize,
    pub batch_size: usize,
    /// Caps an epoch at `epoch_size / batch_size` batches.
    pub epoch_size: Option<usize>,
    pub seed:       u64,
    pub schedule:   CyclicLr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainOutcome {
    Done,
    Interrupted,
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub outcome:  TrainOutcome,
    pub progress: TrainingProgress,
    pub history:  Vec<ValidationMetrics>,
}

pub struct Trainer<B: AutodiffBackend> {
    settings:  TrainerSettings,
    criterion: SegmentationLoss,
    store:     CheckpointStore,
    cancel:    CancellationToken,
    device:    B::Device,
}

impl<B: AutodiffBackend> Trainer<B> {
    pub fn new(
        settings:  TrainerSettings,
        criterion: SegmentationLoss,
        store:     CheckpointStore,
        cancel:    CancellationToken,
        device:    B::Device,
    ) -> Self {
        Self { settings, criterion, store, cancel, device }
    }

    pub fn run<S>(
        &self,
        model:  UNet11<B>,
        train:  Arc<SegDataset<S>>,
        valid:  Arc<SegDataset<S>>,
        loader: &PrefetchLoader,
    ) -> Result<TrainReport>
    where
        S: SampleSource + Send + 'static,
    {
        let cfg = &self.settings;

        // ── Restore or start fresh ────────────────────────────────────────────
        let (mut model, mut progress) = match self.store.try_load(model, &self.device)? {
            (model, Some(progress)) => {
                tracing::info!("Restored model, epoch {}, step {}", progress.epoch, progress.step);
                (model, progress)
            }
            (model, None) => (model, TrainingProgress::fresh()),
        };

        let mut log = EventLog::open(self.store.log_file())?;
        let batcher = SegBatcher::<B>::new(self.device.clone());
        let max_batches = cfg.epoch_size.map(|n| n / cfg.batch_size.max(1));
        let total_batches = max_batches
            .map_or(loader.num_batches(train.len()), |m| m.min(loader.num_batches(train.len())));
        let mut history = Vec::new();

        // ── Epoch loop ────────────────────────────────────────────────────────
        for epoch in progress.epoch..=cfg.n_epochs {
            let lr = cfg.schedule.lr(epoch);
            let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

            let pb = progress_bar(total_batches, epoch, lr)?;
            let mut losses: Vec<f64> = Vec::new();
            let mut mean_loss = f64::NAN;

            let order = epoch_order(train.len(), cfg.seed, epoch);
            let mut batches = loader.iter(train.clone(), order, epoch, max_batches);
            let mut i = 0usize;

            loop {
                if self.cancel.is_cancelled() {
                    drop(batches);
                    pb.abandon();
                    return self.interrupt(&model, progress, epoch, history);
                }
                let Some(items) = batches.next() else { break };

                let batch = batcher.batch(items?);
                let n = batch.ids.len();

                let outputs = model.forward(batch.images);
                let loss = self.criterion.forward(outputs, batch.masks);
                progress.step += 1;

                losses.push(loss.clone().into_scalar().elem::<f64>());
                mean_loss = trailing_mean(&losses);

                // Backward pass + Adam update on the batch-summed loss
                let grads = (loss * n as f64).backward();
                let grads = GradientsParams::from_grads(grads, &model);
                model = optim.step(lr, model, grads);

                pb.inc(1);
                pb.set_message(format!("loss={mean_loss:.5}"));

                if i > 0 && i % REPORT_EACH == 0 {
                    log.write(progress.step, &[("loss", mean_loss)])?;
                }
                i += 1;
            }
            drop(batches);
            pb.finish_and_clear();

            log.write(progress.step, &[("loss", mean_loss)])?;
            progress.epoch = epoch + 1;
            self.store.save(&model, progress)?;

            // ── Validation phase ──────────────────────────────────────────────
            let metrics = validate(&model.valid(), &self.criterion, valid.clone(), loader, &self.device)?;
            log.write(progress.step, &[("valid_loss", metrics.valid_loss), ("dice_loss", metrics.dice)])?;
            history.push(metrics);

            tracing::info!(
                "Epoch {:>3}/{} | lr={:.2e} | loss={:.5} | valid_loss={:.5} | dice={:.5}",
                epoch, cfg.n_epochs, lr, mean_loss, metrics.valid_loss, metrics.dice,
            );

            if progress.observe_valid_loss(metrics.valid_loss) {
                self.store.save(&model, progress)?;
                self.store.copy_to_best()?;
                tracing::info!("New best valid loss {:.5}", metrics.valid_loss);
            }

            // Ctrl-C during validation stops here instead of at the next batch
            if self.cancel.is_cancelled() {
                return self.interrupt(&model, progress, progress.epoch, history);
            }
        }

        tracing::info!("Training complete at step {}", progress.step);
        Ok(TrainReport { outcome: TrainOutcome::Done, progress, history })
    }

    fn interrupt(
        &self,
        model:    &UNet11<B>,
        progress: TrainingProgress,
        epoch:    usize,
        history:  Vec<ValidationMetrics>,
    ) -> Result<TrainReport> {
        let progress = TrainingProgress { epoch, ..progress };
        self.store.save(model, progress)?;
        tracing::info!("Interrupted: saved epoch {}, step {}", progress.epoch, progress.step);
        Ok(TrainReport { outcome: TrainOutcome::Interrupted, progress, history })
    }
}

/// Mean of the last `REPORT_EACH` losses.
fn trailing_mean(losses: &[f64]) -> f64 {
    let window = &losses[losses.len().saturating_sub(REPORT_EACH)..];
    window.iter().sum::<f64>() / window.len() as f64
}

fn progress_bar(total: usize, epoch: usize, lr: f64) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::with_template("Epoch {prefix} │{bar:40.cyan/blue}│ {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.set_prefix(format!("{epoch}, lr {lr:.2e}"));
    Ok(pb)
}
