// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load corpus splits         (Layer 4 - data)
//   Step 2: Fill in a missing valid    (Layer 4 - data)
//   Step 3: Build / load tokenizer     (Layer 6 - infra)
//   Step 4: Encode token streams       (Layer 4 - data)
//   Step 5: Build datasets             (Layer 4 - data)
//   Step 6: Save config                (Layer 6 - infra)
//   Step 7: Run training loop          (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tokenizers::Tokenizer;

use crate::data::{
    dataset::LmDataset,
    loader::TextCorpusLoader,
    masking::TokenMasker,
    splitter::split_train_val,
    stream::encode_corpus,
};
use crate::domain::{
    corpus::{Corpus, CorpusSplit},
    objective::Objective,
    traits::CorpusSource,
};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{SpecialIds, TokenizerStore},
};
use crate::ml::{
    attention::ScalePlacement,
    model::LanguageModelConfig,
    trainer::{run_training, TrainSummary, TrainingData},
};

/// Share of the training lines kept when validation is carved out of them.
pub const CARVED_TRAIN_FRACTION: f64 = 0.9;

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a run. Saved next to the checkpoints so
// evaluation can rebuild the same model. Missing JSON fields fall
// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:            String,
    pub checkpoint_dir:      String,
    pub seq_len:             usize,
    pub train_batch_size:    usize,
    pub eval_batch_size:     usize,
    pub epochs:              usize,
    pub lr:                  f64,
    pub grad_clip:           f64,
    pub log_interval:        usize,
    pub d_model:             usize,
    pub num_heads:           usize,
    pub num_blocks:          usize,
    pub hidden_size:         usize,
    pub ffn_num_layers:      usize,
    pub dropout:             f64,
    pub objective:           Objective,
    pub mask_prob:           f64,
    pub seed:                u64,
    pub max_vocab:           Option<usize>,
    pub scale_after_softmax: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:            "data/wikitext-2".to_string(),
            checkpoint_dir:      "checkpoints".to_string(),
            seq_len:             35,
            train_batch_size:    20,
            eval_batch_size:     10,
            epochs:              3,
            lr:                  5.0,
            grad_clip:           0.5,
            log_interval:        200,
            d_model:             128,
            num_heads:           2,
            num_blocks:          2,
            hidden_size:         512,
            ffn_num_layers:      4,
            dropout:             0.2,
            objective:           Objective::Causal,
            mask_prob:           0.15,
            seed:                42,
            max_vocab:           None,
            scale_after_softmax: false,
        }
    }
}

impl TrainConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed config file '{}'", path.display()))
    }

    /// Run-level checks; model shape checks happen in `LanguageModelConfig::init`.
    pub fn validate(&self) -> Result<()> {
        if self.seq_len == 0 {
            bail!("seq_len must be positive");
        }
        if self.train_batch_size == 0 || self.eval_batch_size == 0 {
            bail!("batch sizes must be positive");
        }
        if !(0.0..=1.0).contains(&self.mask_prob) {
            bail!("mask_prob must lie in [0, 1], got {}", self.mask_prob);
        }
        Ok(())
    }

    pub fn scale_placement(&self) -> ScalePlacement {
        if self.scale_after_softmax {
            ScalePlacement::AfterSoftmax
        } else {
            ScalePlacement::BeforeSoftmax
        }
    }

    /// Model architecture for a vocabulary of `vocab_size` tokens.
    pub fn model_config(&self, vocab_size: usize) -> LanguageModelConfig {
        LanguageModelConfig::new(vocab_size, self.d_model, self.num_heads, self.num_blocks, self.seq_len)
            .with_hidden_size(self.hidden_size)
            .with_ffn_num_layers(self.ffn_num_layers)
            .with_dropout(self.dropout)
            .with_scale_placement(self.scale_placement())
    }
}

// ─── Shared pipeline steps ────────────────────────────────────────────────────

/// Train and validation lines; validation is carved from train when absent.
pub(crate) fn train_and_valid_lines(
    source: &impl CorpusSource,
    seed:   u64,
) -> Result<(Vec<String>, Vec<String>)> {
    let train = source
        .load_split(CorpusSplit::Train)?
        .context("No training split found")?;
    if train.is_empty() {
        bail!("Training split is empty");
    }

    match source.load_split(CorpusSplit::Valid)? {
        Some(valid) => Ok((train.lines, valid.lines)),
        None => {
            tracing::info!("No validation split; holding out {:.0}% of training lines",
                (1.0 - CARVED_TRAIN_FRACTION) * 100.0);
            Ok(split_train_val(train.lines, CARVED_TRAIN_FRACTION, seed))
        }
    }
}

/// Per-split seed offset for masking so splits are corrupted independently.
fn masking_seed(seed: u64, split: CorpusSplit) -> u64 {
    match split {
        CorpusSplit::Train => seed,
        CorpusSplit::Valid => seed.wrapping_add(1),
        CorpusSplit::Test  => seed.wrapping_add(2),
    }
}

/// Encode `lines` and lay them out as samples for `cfg.objective`.
pub(crate) fn build_dataset(
    cfg:        &TrainConfig,
    tokenizer:  &Tokenizer,
    specials:   SpecialIds,
    lines:      &[String],
    split:      CorpusSplit,
    batch_size: usize,
) -> Result<LmDataset> {
    let tokens = encode_corpus(tokenizer, lines)?;

    let dataset = match cfg.objective {
        Objective::Causal => LmDataset::causal(&tokens, batch_size, cfg.seq_len),
        Objective::Masked => {
            let masker = TokenMasker::new(
                specials.mask,
                specials.pad,
                specials.first_word_id(),
                tokenizer.get_vocab_size(true) as u32,
                cfg.mask_prob,
            );
            LmDataset::masked(&tokens, batch_size, cfg.seq_len, &masker, masking_seed(cfg.seed, split))
        }
    };

    tracing::info!(
        "{} split: {} tokens → {} samples ({} objective)",
        split, tokens.len(), dataset.sample_count(), cfg.objective,
    );
    Ok(dataset)
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end.
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;
        cfg.validate()?;

        // ── Step 1–2: Corpus splits ───────────────────────────────────────────
        tracing::info!("Loading corpus from '{}'", cfg.data_dir);
        let loader = TextCorpusLoader::new(&cfg.data_dir);
        let (train_lines, valid_lines) = train_and_valid_lines(&loader, cfg.seed)?;
        let test = loader.load_split(CorpusSplit::Test)?.filter(|c| !c.is_empty());
        if test.is_none() {
            tracing::info!("No test split; skipping final test evaluation");
        }

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        let tokenizer    = TokenizerStore::new(&cfg.checkpoint_dir)
            .load_or_build(&train_lines, cfg.max_vocab)?;
        let specials     = SpecialIds::from_tokenizer(&tokenizer)?;
        let vocab_size   = tokenizer.get_vocab_size(true);

        // ── Step 4–5: Datasets ────────────────────────────────────────────────
        let data = TrainingData {
            train: build_dataset(cfg, &tokenizer, specials, &train_lines, CorpusSplit::Train, cfg.train_batch_size)?,
            valid: build_dataset(cfg, &tokenizer, specials, &valid_lines, CorpusSplit::Valid, cfg.eval_batch_size)?,
            test:  test
                .map(|Corpus { lines, .. }| {
                    build_dataset(cfg, &tokenizer, specials, &lines, CorpusSplit::Test, cfg.eval_batch_size)
                })
                .transpose()?,
        };
        if data.valid.sample_count() == 0 {
            bail!(
                "The valid split is too short for seq_len {} and eval batch size {}",
                cfg.seq_len, cfg.eval_batch_size,
            );
        }

        // ── Step 6: Save config for evaluation ────────────────────────────────
        ckpt_manager.save_config(cfg)?;

        // ── Step 7: Training loop (Layer 5) ───────────────────────────────────
        run_training(cfg, vocab_size, specials.pad, data, &ckpt_manager)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;

    /// Small corpus directory with train/valid/test files.
    pub(crate) fn write_corpus(dir: &Path, with_valid: bool) {
        let sentences = [
            "the cat sat on the mat .",
            "the dog sat on the log .",
            "a cat and a dog met on the mat , then sat .",
            "the <unk> ran to the log and the mat .",
        ];
        let text = |repeat: usize| {
            (0..repeat)
                .map(|i| sentences[i % sentences.len()])
                .collect::<Vec<_>>()
                .join("\n")
        };
        fs::write(dir.join("wiki.train.tokens"), text(40)).unwrap();
        if with_valid {
            fs::write(dir.join("wiki.valid.tokens"), text(8)).unwrap();
        }
        fs::write(dir.join("wiki.test.tokens"), text(8)).unwrap();
    }

    pub(crate) fn tiny_config(data: &Path, ckpt: &Path, objective: Objective) -> TrainConfig {
        TrainConfig {
            data_dir:         data.display().to_string(),
            checkpoint_dir:   ckpt.display().to_string(),
            seq_len:          6,
            train_batch_size: 4,
            eval_batch_size:  2,
            epochs:           1,
            lr:               0.5,
            log_interval:     5,
            d_model:          8,
            num_heads:        2,
            num_blocks:       1,
            hidden_size:      16,
            ffn_num_layers:   2,
            dropout:          0.0,
            objective,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let cfg = TrainConfig::default();
        assert_eq!(cfg.seq_len, 35);
        assert_eq!(cfg.train_batch_size, 20);
        assert_eq!(cfg.eval_batch_size, 10);
        assert_eq!(cfg.objective, Objective::Causal);
        assert_eq!(cfg.scale_placement(), ScalePlacement::BeforeSoftmax);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        fs::write(&path, r#"{ "epochs": 9, "objective": "masked", "max_vocab": 500 }"#).unwrap();

        let cfg = TrainConfig::from_json_file(&path).unwrap();
        assert_eq!(cfg.epochs, 9);
        assert_eq!(cfg.objective, Objective::Masked);
        assert_eq!(cfg.max_vocab, Some(500));
        assert_eq!(cfg.seq_len, 35);
    }

    #[test]
    fn test_validate_rejects_bad_run_settings() {
        let zero_seq = TrainConfig { seq_len: 0, ..TrainConfig::default() };
        let zero_bs  = TrainConfig { eval_batch_size: 0, ..TrainConfig::default() };
        let bad_prob = TrainConfig { mask_prob: 1.5, ..TrainConfig::default() };
        assert!(zero_seq.validate().is_err());
        assert!(zero_bs.validate().is_err());
        assert!(bad_prob.validate().is_err());
    }

    #[test]
    fn test_model_config_mirrors_run_config() {
        let cfg   = TrainConfig { scale_after_softmax: true, ..TrainConfig::default() };
        let model = cfg.model_config(1000);
        assert_eq!(model.vocab_size, 1000);
        assert_eq!(model.max_seq_len, 35);
        assert_eq!(model.num_blocks, 2);
        assert_eq!(model.scale_placement, ScalePlacement::AfterSoftmax);
    }

    #[test]
    fn test_missing_valid_split_is_carved_from_train() {
        let dir = tempfile::tempdir().unwrap();
        write_corpus(dir.path(), false);

        let loader = TextCorpusLoader::new(dir.path());
        let (train, valid) = train_and_valid_lines(&loader, 42).unwrap();
        assert_eq!(train.len(), 36);
        assert_eq!(valid.len(), 4);
    }

    #[test]
    fn test_missing_train_split_is_an_error() {
        let dir    = tempfile::tempdir().unwrap();
        let loader = TextCorpusLoader::new(dir.path());
        assert!(train_and_valid_lines(&loader, 0).is_err());
    }

    #[test]
    fn test_causal_training_writes_checkpoints() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        write_corpus(data.path(), true);

        let cfg     = tiny_config(data.path(), ckpt.path(), Objective::Causal);
        let summary = TrainUseCase::new(cfg.clone()).execute().unwrap();

        assert_eq!(summary.epochs.len(), 1);
        assert!(summary.epochs[0].valid.loss.is_finite());
        assert!(summary.test.is_some());
        assert!(ckpt.path().join("model_epoch_1.mpk").exists());
        assert!(ckpt.path().join("tokenizer.json").exists());

        let saved = CheckpointManager::existing(ckpt.path()).unwrap().load_config().unwrap();
        assert_eq!(saved, cfg);
    }

    #[test]
    fn test_masked_training_runs_without_valid_file() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        write_corpus(data.path(), false);

        let cfg     = tiny_config(data.path(), ckpt.path(), Objective::Masked);
        let summary = TrainUseCase::new(cfg).execute().unwrap();

        let valid = summary.epochs[0].valid;
        assert!(valid.loss.is_finite());
        assert!(valid.tokens > 0);
    }

    #[test]
    fn test_too_short_valid_split_is_rejected() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        write_corpus(data.path(), false);
        fs::write(data.path().join("wiki.valid.tokens"), "the cat").unwrap();

        let cfg = tiny_config(data.path(), ckpt.path(), Objective::Causal);
        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(err.to_string().contains("valid split is too short"), "{err}");
        assert!(!ckpt.path().join("model_epoch_1.mpk").exists());
    }
}
