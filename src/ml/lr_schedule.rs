// ============================================================
// Layer 5 — Cyclic Learning-Rate Schedule
// ============================================================
// Step decay inside a fixed-length cycle, reset at every cycle:
//
//   lr(e) = init_lr * decay_factor ^ floor((e mod cycle_len) / decay_every)
//
// With the defaults (cycle 5, decay every 2, factor 0.5):
//
//   epoch  5  6  7  8  9 | 10 11 12 ...
//   mult   1  1 .5 .5 .25|  1  1 .5 ...
//
// Pure in the absolute epoch number, so a resumed run picks up the
// same rate it would have had without the interruption.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CyclicLr {
    pub init_lr:      f64,
    pub cycle_len:    usize,
    pub decay_every:  usize,
    pub decay_factor: f64,
}

impl Default for CyclicLr {
    fn default() -> Self {
        Self { init_lr: 1e-4, cycle_len: 5, decay_every: 2, decay_factor: 0.5 }
    }
}

impl CyclicLr {
    pub fn with_init_lr(init_lr: f64) -> Self {
        Self { init_lr, ..Self::default() }
    }

    pub fn lr(&self, epoch: usize) -> f64 {
        let within = epoch % self.cycle_len.max(1);
        let decays = within / self.decay_every.max(1);
        self.init_lr * self.decay_factor.powi(decays as i32)
    }
}
