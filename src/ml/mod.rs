// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// This layer contains the Burn model, training and decoding
// code. The data layer builds tensors for it; nothing above
// this layer touches a network module directly.
//
// What's in this layer:
//
//   gru.rs        — One GRU cell with a masked step for padded batches
//   attention.rs  — Luong dot / general / concat scoring
//   encoder.rs    — Bidirectional multi-layer GRU over the query
//   decoder.rs    — One attention decoder step
//   model.rs      — Seq2Seq: shared embedding + encoder + decoder
//   loss.rs       — Masked negative log-likelihood per timestep
//   grad_clip.rs  — Norm clipping over a whole parameter group
//   trainer.rs    — Iteration loop, teacher forcing, two Adam
//                   optimisers, checkpointing
//   greedy.rs     — Greedy autoregressive decoding
//   inferencer.rs — Checkpoint loading and chat replies
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Sutskever et al. (2014) Sequence to Sequence Learning
//            Luong et al. (2015) Effective Approaches to Attention

/// Gated recurrent unit cell
pub mod gru;

/// Attention scoring over encoder outputs
pub mod attention;

/// Bidirectional GRU encoder
pub mod encoder;

/// Luong attention decoder
pub mod decoder;

/// Encoder–decoder model with a shared embedding
pub mod model;

/// Masked NLL loss
pub mod loss;

/// Group-wise gradient norm clipping
pub mod grad_clip;

/// Training loop with checkpointing
pub mod trainer;

/// Greedy search decoding
pub mod greedy;

/// Inference engine — loads checkpoint and replies to input
pub mod inferencer;
