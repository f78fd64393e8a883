// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe the segmentation task:
// samples and their padding, the train/validation fold,
// the resumable training progress and the cancellation flag.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// An image/mask pair and the border padding applied to it
pub mod sample;

// Deterministic train/validation partition of the id list
pub mod fold;

// Epoch / step / best-loss counters persisted in checkpoints
pub mod progress;

// Cooperative cancellation flag checked by the training loop
pub mod cancel;

// Core abstractions (traits) that other layers implement
pub mod traits;
