// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between the raw movie-dialog files and the padded
// tensor batches the model consumes.
//
// The pipeline flows in this order:
//
//   movie_lines.txt + movie_conversations.txt
//       │
//       ▼
//   CornellCorpus        → formatted_movie_lines.txt (query\tresponse)
//       │
//       ▼
//   FormattedPairLoader  → normalised SentencePairs (Preprocessor)
//       │
//       ▼
//   trimmer              → length filter, vocabulary, rare-word trim
//       │
//       ▼
//   PairDataset          → tokenised EncodedPairs
//       │
//       ▼
//   PairBatcher          → padded, sorted, masked tensor batches
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Cornell corpus extraction and the formatted pair file reader
pub mod loader;

/// Sentence normalisation shared by training and chat
pub mod preprocessor;

/// Length filtering, vocabulary counting and rare-word trimming
pub mod trimmer;

/// Tokenised pairs and Burn's Dataset trait
pub mod dataset;

/// Padded time-major batches with masks
pub mod batcher;
