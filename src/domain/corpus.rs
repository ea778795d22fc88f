// ============================================================
// Layer 3 — Corpus Domain Types
// ============================================================
// A corpus is split into train / valid / test parts, each a list
// of text lines. Tokenisation happens later in the data layer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One of the three conventional corpus partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusSplit {
    Train,
    Valid,
    Test,
}

impl CorpusSplit {
    pub fn name(&self) -> &'static str {
        match self {
            CorpusSplit::Train => "train",
            CorpusSplit::Valid => "valid",
            CorpusSplit::Test  => "test",
        }
    }

    /// File names tried for this split, in order.
    /// WikiText layout first, then plain `<split>.txt`.
    pub fn file_candidates(&self) -> [String; 2] {
        [
            format!("wiki.{}.tokens", self.name()),
            format!("{}.txt", self.name()),
        ]
    }
}

impl fmt::Display for CorpusSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CorpusSplit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train"                    => Ok(CorpusSplit::Train),
            "valid" | "validation" | "val" => Ok(CorpusSplit::Valid),
            "test"                     => Ok(CorpusSplit::Test),
            other => Err(format!("unknown corpus split '{other}' (expected train, valid or test)")),
        }
    }
}

/// The cleaned, non-empty lines of one split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub split: CorpusSplit,
    pub lines: Vec<String>,
}

impl Corpus {
    pub fn new(split: CorpusSplit, lines: Vec<String>) -> Self {
        Self { split, lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whitespace-separated word count, for logging.
    pub fn word_count(&self) -> usize {
        self.lines.iter().map(|l| l.split_whitespace().count()).sum()
    }
}
