// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-facing goal: prepare the corpus, train, or chat.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No argument parsing here (that's Layer 1)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Raw corpus → formatted pair file
pub mod prepare_use_case;

// The training workflow
pub mod train_use_case;

// The interactive chat workflow
pub mod chat_use_case;
