// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that touches the filesystem on behalf of training
// and chat, apart from reading the corpus:
//
//   checkpoint.rs — Saving and loading training snapshots
//                   Model and optimiser records go through
//                   Burn's file recorder; iteration, loss,
//                   vocabulary and architecture go to JSON so
//                   chat can rebuild the exact same model.
//
//   metrics.rs    — Training metrics logging
//                   Appends the running average loss to a CSV
//                   file for later plotting.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Training checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
