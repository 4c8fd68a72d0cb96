// ============================================================
// Layer 4 — Pair Batcher
// ============================================================
// Converts a list of tokenised pairs into padded, time-major
// tensors for the encoder and decoder.
//
// How batching works here:
//   1. Sort pairs by query length, longest first. The encoder
//      walks the batch one timestep at a time and expects the
//      lengths to be non-increasing.
//   2. Pad queries with PAD up to the longest query and record
//      each true length (EOS included).
//   3. Pad responses the same way and build a mask that is true
//      wherever the response has a real token.
//
// Tensors are time-major: row t holds timestep t of every
// sentence in the batch.
//
//   queries [5 9 2] [7 2]      input  = [[5, 7],
//                                        [9, 2],
//                                        [2, 0]]   lengths = [3, 2]
//
// Reference: Burn Book §4 (Batcher)
//            Rust Book §8 (Vectors)

use burn::prelude::*;

use crate::data::dataset::EncodedPair;
use crate::domain::{error::ChatbotError, vocabulary::PAD_TOKEN};

// ─── PairBatch ────────────────────────────────────────────────────────────────
/// A padded batch of B pairs, sorted by descending query length.
#[derive(Debug, Clone)]
pub struct PairBatch<B: Backend> {
    /// Query token IDs — shape: [max_input_len, batch_size]
    pub input: Tensor<B, 2, Int>,

    /// True query lengths including EOS, non-increasing — length batch_size
    pub lengths: Vec<usize>,

    /// Response token IDs — shape: [max_target_len, batch_size]
    pub target: Tensor<B, 2, Int>,

    /// true = real response token, false = padding — shape: [max_target_len, batch_size]
    pub mask: Tensor<B, 2, Bool>,

    /// Length of the longest response in the batch
    pub max_target_len: usize,
}

impl<B: Backend> PairBatch<B> {
    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    pub fn device(&self) -> B::Device {
        self.input.device()
    }
}

// ─── PairBatcher ──────────────────────────────────────────────────────────────
/// Holds the target device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct PairBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> PairBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Build one batch. Fails only on an empty pair list.
    pub fn batch(&self, mut items: Vec<EncodedPair>) -> Result<PairBatch<B>, ChatbotError> {
        if items.is_empty() {
            return Err(ChatbotError::EmptyBatch);
        }
        let batch_size = items.len();

        // Stable sort keeps the sampling order among equal lengths
        items.sort_by(|a, b| b.query.len().cmp(&a.query.len()));

        let queries: Vec<&[u32]>   = items.iter().map(|p| p.query.as_slice()).collect();
        let responses: Vec<&[u32]> = items.iter().map(|p| p.response.as_slice()).collect();

        let lengths: Vec<usize>          = queries.iter().map(|q| q.len()).collect();
        let (input_flat, max_input_len)   = zero_padding(&queries);
        let (target_flat, max_target_len) = zero_padding(&responses);

        let input = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([max_input_len, batch_size]);

        let target = Tensor::<B, 1, Int>::from_ints(target_flat.as_slice(), &self.device)
            .reshape([max_target_len, batch_size]);

        let mask = target.clone().equal_elem(PAD_TOKEN as i32).bool_not();

        Ok(PairBatch { input, lengths, target, mask, max_target_len })
    }

    /// A single sentence as a [len, 1] batch for greedy decoding.
    pub fn single(&self, indexes: &[u32]) -> (Tensor<B, 2, Int>, usize) {
        let flat: Vec<i32> = indexes.iter().map(|&x| x as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([indexes.len(), 1]);
        (input, indexes.len())
    }
}

/// Transpose a ragged list of sequences into a time-major, PAD-filled
/// flat buffer. Returns the buffer and the padded length.
fn zero_padding(sequences: &[&[u32]]) -> (Vec<i32>, usize) {
    let max_len = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
    let columns = sequences.len();

    let mut flat = vec![PAD_TOKEN as i32; max_len * columns];
    for (col, seq) in sequences.iter().enumerate() {
        for (t, &token) in seq.iter().enumerate() {
            flat[t * columns + col] = token as i32;
        }
    }
    (flat, max_len)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn pair(query: &[u32], response: &[u32]) -> EncodedPair {
        EncodedPair { query: query.to_vec(), response: response.to_vec() }
    }

    fn items() -> Vec<EncodedPair> {
        vec![
            pair(&[7, 2], &[3, 4, 5, 2]),
            pair(&[5, 9, 8, 2], &[6, 2]),
            pair(&[4, 2], &[3, 2]),
            pair(&[3, 6, 2], &[9, 9, 2]),
        ]
    }

    fn ints(t: Tensor<TestBackend, 2, Int>) -> Vec<i64> {
        t.into_data().iter::<i64>().collect()
    }

    #[test]
    fn test_shapes_and_sorted_lengths() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(items()).unwrap();

        assert_eq!(batch.input.dims(), [4, 4]);
        assert_eq!(batch.target.dims(), [4, 4]);
        assert_eq!(batch.mask.dims(), [4, 4]);
        assert_eq!(batch.max_target_len, 4);
        assert_eq!(batch.lengths, vec![4, 3, 2, 2]);
        assert!(batch.lengths.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_columns_match_recorded_lengths() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(items()).unwrap();
        let [rows, cols] = batch.input.dims();
        let input   = ints(batch.input.clone());

        for col in 0..cols {
            let real = (0..rows)
                .take_while(|&t| input[t * cols + col] != PAD_TOKEN as i64)
                .count();
            assert_eq!(real, batch.lengths[col]);
            assert!((real..rows).all(|t| input[t * cols + col] == PAD_TOKEN as i64));
        }
    }

    #[test]
    fn test_mask_is_true_exactly_where_target_is_not_pad() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(items()).unwrap();

        let target: Vec<i64> = ints(batch.target.clone());
        let mask: Vec<bool>  = batch.mask.clone().into_data().iter::<bool>().collect();
        assert_eq!(target.len(), mask.len());
        for (t, m) in target.iter().zip(mask.iter()) {
            assert_eq!(*m, *t != PAD_TOKEN as i64);
        }
    }

    #[test]
    fn test_targets_follow_their_queries_after_sorting() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(items()).unwrap();
        let target  = ints(batch.target);
        // Longest query [5 9 8 2] was paired with [6 2]; it is now column 0
        assert_eq!(target[0], 6);
        assert_eq!(target[4], 2);
        assert_eq!(target[8], PAD_TOKEN as i64);
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        assert!(matches!(batcher.batch(Vec::new()), Err(ChatbotError::EmptyBatch)));
    }

    #[test]
    fn test_single_sentence_batch() {
        let batcher = PairBatcher::<TestBackend>::new(Default::default());
        let (input, len) = batcher.single(&[4, 5, 2]);
        assert_eq!(input.dims(), [3, 1]);
        assert_eq!(len, 3);
    }
}
