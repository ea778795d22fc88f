// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads a plain-text corpus laid out as one file per split:
//
//   data/wikitext-2/
//     wiki.train.tokens    (or train.txt)
//     wiki.valid.tokens    (or valid.txt)
//     wiki.test.tokens     (or test.txt)
//
// Each file is read line by line, cleaned by the Preprocessor,
// and blank lines are dropped.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::preprocessor::Preprocessor;
use crate::domain::corpus::{Corpus, CorpusSplit};
use crate::domain::traits::CorpusSource;

/// Loads corpus splits from a directory of text files.
pub struct TextCorpusLoader {
    dir:          PathBuf,
    preprocessor: Preprocessor,
}

impl TextCorpusLoader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir:          dir.as_ref().to_path_buf(),
            preprocessor: Preprocessor::new(),
        }
    }

    /// First existing file for `split`, if any.
    pub fn split_path(&self, split: CorpusSplit) -> Option<PathBuf> {
        split
            .file_candidates()
            .iter()
            .map(|name| self.dir.join(name))
            .find(|path| path.is_file())
    }
}

impl CorpusSource for TextCorpusLoader {
    fn load_split(&self, split: CorpusSplit) -> Result<Option<Corpus>> {
        let Some(path) = self.split_path(split) else {
            tracing::debug!("No {} split found in '{}'", split, self.dir.display());
            return Ok(None);
        };

        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
        let lines = self.preprocessor.clean_lines(&text);

        if lines.is_empty() {
            tracing::warn!("Corpus file '{}' has no non-blank lines", path.display());
        }

        let corpus = Corpus::new(split, lines);
        tracing::info!(
            "Loaded {} split from '{}': {} lines, {} words",
            split,
            path.display(),
            corpus.lines.len(),
            corpus.word_count(),
        );
        Ok(Some(corpus))
    }
}
