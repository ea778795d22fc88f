// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model and training code lives here.
//
//   positional.rs   — sinusoidal position table
//   mask.rs         — triangular visibility flags → attention mask
//   attention.rs    — single head + multi-head self-attention
//   feed_forward.rs — stacked Linear/ReLU network
//   encoder.rs      — post-norm encoder blocks and the stack
//   model.rs        — token embedding + encoder + vocabulary head
//   trainer.rs      — SGD training loop and evaluation
//   backend.rs      — concrete backend and execution context
//   error.rs        — typed construction/shape errors
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Typed errors for model construction and forward passes
pub mod error;

/// Sinusoidal positional encoding table
pub mod positional;

/// Attention mask utilities
pub mod mask;

/// Scaled dot-product attention heads
pub mod attention;

/// Position-wise feed-forward network
pub mod feed_forward;

/// Encoder blocks and the full encoder stack
pub mod encoder;

/// Language model built on the encoder
pub mod model;

/// Backend selection and execution context
pub mod backend;

/// Training loop with validation and checkpointing
pub mod trainer;
