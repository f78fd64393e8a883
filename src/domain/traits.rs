// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer works against these traits; the data
// layer provides the file-backed implementations.
//
//   - CsvIdSource   implements IdSource      (train.csv id column)
//   - DirIdSource   implements IdSource      (stems of *.png in a dir)
//   - SampleStore   implements SampleSource  (images/ + masks/ dirs)
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::Sample;

// ─── IdSource ─────────────────────────────────────────────────────────────────
/// Anything that can list sample identifiers, in a stable order.
pub trait IdSource {
    fn load_ids(&self) -> Result<Vec<String>>;
}

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Maps an identifier to its loaded, padded sample.
///
/// Must be `Sync` so a worker pool can load samples concurrently.
pub trait SampleSource: Sync {
    /// Load the image and, unless this is a test source, its mask.
    fn load(&self, id: &str) -> Result<Sample>;
}
