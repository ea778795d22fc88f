// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer loads text through `CorpusSource`
// and never sees where or how the text is stored.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::corpus::{Corpus, CorpusSplit};

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Anything that can provide the lines of a corpus split.
///
/// Implementations:
///   - TextCorpusLoader → one plain-text file per split in a directory
pub trait CorpusSource {
    /// Load one split. `Ok(None)` means the source has no such split.
    fn load_split(&self, split: CorpusSplit) -> Result<Option<Corpus>>;
}
