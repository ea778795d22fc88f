// ============================================================
// Layer 5 — Model Errors
// ============================================================
// Configuration problems are reported by `init`, shape problems
// by the first component that receives the bad tensor.

/// Errors raised while building or running the encoder stack.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("input feature width {actual} does not match model width {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("sequence length {len} exceeds the positional table length {max}")]
    SequenceTooLong { len: usize, max: usize },

    #[error("cannot attend over an empty sequence")]
    EmptySequence,

    #[error("attention mask must be [{expected}, {expected}], got {actual:?}")]
    MaskShapeMismatch { expected: usize, actual: [usize; 2] },
}

impl ModelError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Shorthand used by every `init` and checked `forward`.
pub type ModelResult<T> = Result<T, ModelError>;
