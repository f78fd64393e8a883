// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns that don't belong in any specific
// business layer:
//
//   checkpoint.rs — Saving and loading training state
//                   Uses Burn's NamedMpkGzFileRecorder for one
//                   record holding weights, epoch, step and best
//                   validation loss. Also saves/loads the run
//                   config as JSON so prediction can rebuild the
//                   model.
//
//   event_log.rs  — Training event log
//                   Appends JSON lines (step, timestamp, losses)
//                   to train_<fold>.log, flushed per line.
//
//   device.rs     — Device context
//                   Parses --device-ids once at startup into
//                   either the CPU or a GPU index.
//
//   interrupt.rs  — Ctrl-C hook
//                   Flips the training cancellation token.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Checkpoint and config persistence
pub mod checkpoint;

/// JSON-lines training event log
pub mod event_log;

/// --device-ids parsing
pub mod device;

/// Ctrl-C to cancellation token
pub mod interrupt;
