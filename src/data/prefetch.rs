// ============================================================
// Layer 4 — Prefetching Batch Loader
// ============================================================
// Loads and augments batches ahead of the training step.
//
//   producer thread ──► rayon pool (N workers) ──► sync_channel(N) ──► consumer
//
// The producer walks the epoch's index order one batch at a time.
// Each batch's samples are loaded in parallel on the pool and
// collected back in index order, then pushed into a bounded channel,
// so at most N batches wait ahead of the consumer and batches arrive
// exactly in the order they were scheduled.
//
// Dropping the iterator early (e.g. on interrupt) closes the channel;
// the producer notices on its next send and exits.
//
// Reference: rayon (ThreadPoolBuilder, par_iter), std::sync::mpsc

use anyhow::{Context, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use std::{
    sync::{mpsc, Arc},
    thread::{self, JoinHandle},
};

use crate::data::dataset::{SegDataset, SegItem};
use crate::domain::traits::SampleSource;

pub struct PrefetchLoader {
    pool:       Arc<rayon::ThreadPool>,
    workers:    usize,
    batch_size: usize,
}

impl PrefetchLoader {
    pub fn new(workers: usize, batch_size: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("loader-{i}"))
            .build()
            .context("Failed to build data loader thread pool")?;
        Ok(Self { pool: Arc::new(pool), workers, batch_size: batch_size.max(1) })
    }

    /// Number of batches for `len` samples, last batch possibly short.
    pub fn num_batches(&self, len: usize) -> usize {
        len.div_ceil(self.batch_size)
    }

    /// Start producing batches of `dataset` in `order`, at most `max_batches`.
    pub fn iter<S>(
        &self,
        dataset:     Arc<SegDataset<S>>,
        order:       Vec<usize>,
        epoch:       usize,
        max_batches: Option<usize>,
    ) -> BatchIter
    where
        S: SampleSource + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(self.workers);
        let pool = Arc::clone(&self.pool);
        let batch_size = self.batch_size;
        let limit = max_batches.unwrap_or(usize::MAX);

        let producer = thread::spawn(move || {
            for chunk in order.chunks(batch_size).take(limit) {
                let batch: Result<Vec<SegItem>> = pool.install(|| {
                    chunk
                        .par_iter()
                        .map(|&index| dataset.item(index, epoch))
                        .collect()
                });
                let failed = batch.is_err();
                if tx.send(batch).is_err() || failed {
                    break;
                }
            }
        });

        BatchIter { rx: Some(rx), producer: Some(producer) }
    }
}

pub struct BatchIter {
    rx:       Option<mpsc::Receiver<Result<Vec<SegItem>>>>,
    producer: Option<JoinHandle<()>>,
}

impl Iterator for BatchIter {
    type Item = Result<Vec<SegItem>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rx.as_ref()?.recv().ok()
    }
}

impl Drop for BatchIter {
    fn drop(&mut self) {
        // close the channel first so a blocked producer wakes up
        self.rx.take();
        if let Some(handle) = self.producer.take() {
            if handle.join().is_err() {
                tracing::warn!("Data loader thread panicked");
            }
        }
    }
}

/// Sequential order `0..len`, used for validation and prediction.
pub fn sequential_order(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// A fresh shuffle of `0..len` for every epoch, reproducible from the seed.
pub fn epoch_order(len: usize, seed: u64, epoch: usize) -> Vec<usize> {
    let mut order = sequential_order(len);
    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(epoch as u64));
    order.shuffle(&mut rng);
    order
}
