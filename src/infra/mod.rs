// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting persistence used by both training and
// evaluation:
//
//   checkpoint.rs      — Saving and loading model weights
//                        with Burn's CompactRecorder, plus the
//                        run config as JSON so evaluation can
//                        rebuild the model.
//
//   tokenizer_store.rs — Word-level vocabulary persistence.
//                        Builds tokenizer.json from the training
//                        corpus if none exists, or loads the
//                        saved one, so training and evaluation
//                        share one vocabulary.
//
// Reference: Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Vocabulary building, saving, and loading
pub mod tokenizer_store;
