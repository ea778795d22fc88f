// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from raw corpus files to tensor batches.
//
//   wiki.{split}.tokens
//       │
//       ▼
//   TextCorpusLoader  → reads a split, one cleaned line per entry
//       │
//       ▼
//   Preprocessor      → whitespace/control-character cleanup
//       │
//       ▼
//   Tokenizer         → word ids (infra::tokenizer_store)
//       │
//       ▼
//   stream            → flat stream → b parallel streams → windows
//       │
//       ▼
//   LmDataset         → causal or masked samples (Burn Dataset)
//       │
//       ▼
//   LmBatcher         → [b, s] inputs + [b·s] targets
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Reads corpus split files from a directory
pub mod loader;

/// Cleans raw text lines and splits them into basic tokens
pub mod preprocessor;

/// Token streams, batchify and window layout
pub mod stream;

/// BERT-style masked-token corruption
pub mod masking;

/// Implements Burn's Dataset trait for LM samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits lines into train/validation sets
pub mod splitter;
