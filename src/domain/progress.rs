// ============================================================
// Layer 3 — Training Progress
// ============================================================
// The scalar half of a checkpoint: which epoch to run next,
// how many optimiser steps have been taken, and the best
// validation loss seen so far.
//
// A fresh run starts at epoch 1, step 0, best = +infinity.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub epoch:           usize,
    pub step:            usize,
    pub best_valid_loss: f64,
}

impl TrainingProgress {
    pub fn fresh() -> Self {
        Self { epoch: 1, step: 0, best_valid_loss: f64::INFINITY }
    }

    /// Records `valid_loss` if it is strictly lower than the best so far.
    /// Returns true when the best loss improved.
    pub fn observe_valid_loss(&mut self, valid_loss: f64) -> bool {
        if valid_loss < self.best_valid_loss {
            self.best_valid_loss = valid_loss;
            true
        } else {
            false
        }
    }
}

impl Default for TrainingProgress {
    fn default() -> Self {
        Self::fresh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state() {
        let p = TrainingProgress::fresh();
        assert_eq!(p.epoch, 1);
        assert_eq!(p.step, 0);
        assert!(p.best_valid_loss.is_infinite());
    }

    #[test]
    fn test_best_loss_only_moves_down() {
        let mut p = TrainingProgress::fresh();
        assert!(p.observe_valid_loss(0.5));
        assert!(!p.observe_valid_loss(0.5));
        assert!(!p.observe_valid_loss(0.7));
        assert!(p.observe_valid_loss(0.4));
        assert_eq!(p.best_valid_loss, 0.4);
    }

    #[test]
    fn test_nan_never_counts_as_improvement() {
        let mut p = TrainingProgress::fresh();
        assert!(!p.observe_valid_loss(f64::NAN));
        assert!(p.best_valid_loss.is_infinite());
    }
}
