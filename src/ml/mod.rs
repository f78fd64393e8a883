// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the model and everything that runs it.
// The data layer only builds tensors; the infra layer only
// persists records.
//
// What's in this layer:
//
//   model.rs       — UNet11: VGG11-shaped encoder, transposed
//                    convolution decoder with skip connections
//
//   loss.rs        — BCE-with-logits blended with a soft
//                    Jaccard term
//
//   lr_schedule.rs — cyclic step-decay learning rate, a pure
//                    function of the epoch number
//
//   trainer.rs     — the resumable, interruptible training
//                    loop with per-epoch checkpointing
//
//   validation.rs  — validation loss and Dice coefficient
//
//   predictor.rs   — sigmoid masks for unlabelled images
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Ronneberger et al. (2015) U-Net

/// UNet11 segmentation model architecture
pub mod model;

/// Segmentation loss (BCE + Jaccard)
pub mod loss;

/// Cyclic learning-rate schedule
pub mod lr_schedule;

/// Training loop with checkpoint/resume and interrupt handling
pub mod trainer;

/// Validation metrics
pub mod validation;

/// Inference over test images
pub mod predictor;
