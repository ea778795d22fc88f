// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves, and loads the word-level vocabulary.
//
// The vocabulary is written straight into a HuggingFace
// tokenizer.json and loaded back with Tokenizer::from_file,
// which avoids the trainer/ModelWrapper type mismatch of
// tokenizers 0.15:
//
//   added_tokens   <unk>=0  <pad>=1  <mask>=2   (matched raw)
//   normalizer     Lowercase
//   pre_tokenizer  Whitespace   (\w+ | [^\w\s]+)
//   model          WordLevel, unk_token = <unk>
//
// Words follow the specials ordered by descending corpus
// frequency, ties alphabetical. Counting uses basic_tokens,
// which splits lines the same way the pre-tokenizer does.

use anyhow::{anyhow, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};
use tokenizers::Tokenizer;

use crate::data::preprocessor::{basic_tokens, UNK_MARKER};

pub const PAD_TOKEN:  &str = "<pad>";
pub const MASK_TOKEN: &str = "<mask>";

/// Reserved tokens in id order.
pub const SPECIAL_TOKENS: [&str; 3] = [UNK_MARKER, PAD_TOKEN, MASK_TOKEN];

const TOKENIZER_FILE: &str = "tokenizer.json";

/// Ids of the reserved tokens in a loaded tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialIds {
    pub unk:  u32,
    pub pad:  u32,
    pub mask: u32,
}

impl SpecialIds {
    pub fn from_tokenizer(tokenizer: &Tokenizer) -> Result<Self> {
        let id = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| anyhow!("Tokenizer has no '{token}' token"))
        };
        Ok(Self { unk: id(UNK_MARKER)?, pad: id(PAD_TOKEN)?, mask: id(MASK_TOKEN)? })
    }

    /// First id that belongs to a corpus word.
    pub fn first_word_id(&self) -> u32 {
        self.unk.max(self.pad).max(self.mask) + 1
    }
}

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(TOKENIZER_FILE)
    }

    /// Load an existing tokenizer or build a new one from `lines`.
    ///
    /// An existing file wins; `max_vocab` only applies to a fresh build.
    pub fn load_or_build(&self, lines: &[String], max_vocab: Option<usize>) -> Result<Tokenizer> {
        if self.path().exists() {
            tracing::info!("Loading existing tokenizer from '{}'", self.path().display());
            if let Some(cap) = max_vocab {
                tracing::warn!(
                    "max_vocab={} ignored: reusing '{}'; delete it to rebuild the vocabulary",
                    cap, self.path().display(),
                );
            }
            self.load()
        } else {
            tracing::info!("Building new tokenizer (max_vocab={:?})", max_vocab);
            self.build_and_save(lines, max_vocab)
        }
    }

    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path)
            .map_err(|e| anyhow!("Cannot load tokenizer from '{}': {}", path.display(), e))
    }

    fn build_and_save(&self, lines: &[String], max_vocab: Option<usize>) -> Result<Tokenizer> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let vocab_list = build_vocab(lines, max_vocab)?;
        let vocab: serde_json::Map<String, serde_json::Value> = vocab_list
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), serde_json::json!(id)))
            .collect();

        let added_tokens: Vec<serde_json::Value> = SPECIAL_TOKENS
            .iter()
            .enumerate()
            .map(|(id, token)| serde_json::json!({
                "id": id, "content": token, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true,
            }))
            .collect();

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": added_tokens,
            "normalizer": { "type": "Lowercase" },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_MARKER,
            }
        });

        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer JSON to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} tokens, saved to '{}'",
            vocab_list.len(),
            path.display()
        );

        Tokenizer::from_file(&path).map_err(|e| anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Specials followed by corpus words, most frequent first.
///
/// `max_vocab` caps the total size, specials included.
pub fn build_vocab(lines: &[String], max_vocab: Option<usize>) -> Result<Vec<String>> {
    if let Some(max) = max_vocab {
        if max <= SPECIAL_TOKENS.len() {
            return Err(anyhow!(
                "max_vocab must exceed the {} special tokens, got {max}",
                SPECIAL_TOKENS.len()
            ));
        }
    }

    let mut freq: HashMap<String, usize> = HashMap::new();
    for line in lines {
        for token in basic_tokens(line) {
            if !SPECIAL_TOKENS.contains(&token.as_str()) {
                *freq.entry(token).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(max) = max_vocab {
        words.truncate(max - SPECIAL_TOKENS.len());
    }

    Ok(SPECIAL_TOKENS
        .iter()
        .map(|s| s.to_string())
        .chain(words.into_iter().map(|(w, _)| w))
        .collect())
}
