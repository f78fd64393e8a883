// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// This layer handles everything from PNG files on disk all the
// way to tensor batches on the training device.
//
// The pipeline flows in this order:
//
//   train.csv / test/images
//       │
//       ▼
//   CsvIdSource / DirIdSource   → sample identifiers
//       │
//       ▼
//   SampleStore                 → decodes PNGs, reflect-pads to /32
//       │
//       ▼
//   augment                     → flip + photometric jitter (train only)
//       │
//       ▼
//   SegDataset                  → CHW floats, binary targets
//       │
//       ▼
//   PrefetchLoader              → parallel, ordered, bounded prefetch
//       │
//       ▼
//   SegBatcher                  → stacks items into tensor batches
//
// Each module is responsible for exactly one step.
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// 8-bit colour-space conversions (HSV, gray)
pub mod color;

/// PNG decoding, reflect padding and cropping
pub mod image_io;

/// Random flip and photometric transforms
pub mod augment;

/// Id sources and the file-backed sample store
pub mod loader;

/// Per-sample conversion into model-ready floats
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Worker-pool prefetching and per-epoch ordering
pub mod prefetch;
