// ============================================================
// Layer 2 — Evaluate Use Case
// ============================================================
// Rebuilds a trained model from its checkpoint directory and
// measures loss/perplexity on one corpus split:
//
//   train_config.json ─┐
//   tokenizer.json    ─┼─▶ LanguageModel ◀── latest weights
//                      │
//   corpus split ──────┴─▶ LmDataset ──▶ evaluate()
//
// Evaluation runs on the plain compute backend, so dropout is
// inactive.

use anyhow::{bail, Result};

use crate::application::train_use_case::{build_dataset, train_and_valid_lines};
use crate::data::loader::TextCorpusLoader;
use crate::domain::{corpus::CorpusSplit, traits::CorpusSource};
use crate::infra::{
    checkpoint::CheckpointManager,
    tokenizer_store::{SpecialIds, TokenizerStore},
};
use crate::ml::{
    backend::{default_context, ComputeBackend},
    model::LanguageModel,
    trainer::{evaluate, window_loader, EvalReport},
};

pub struct EvaluateUseCase {
    checkpoint_dir: String,
    /// Overrides the data directory recorded in the saved config.
    data_dir:       Option<String>,
    split:          CorpusSplit,
}

impl EvaluateUseCase {
    pub fn new(checkpoint_dir: String, data_dir: Option<String>, split: CorpusSplit) -> Self {
        Self { checkpoint_dir, data_dir, split }
    }

    pub fn execute(&self) -> Result<EvalReport> {
        let ckpt_manager = CheckpointManager::existing(&self.checkpoint_dir)?;
        let cfg          = ckpt_manager.load_config()?;
        let tokenizer    = TokenizerStore::new(&self.checkpoint_dir).load()?;
        let specials     = SpecialIds::from_tokenizer(&tokenizer)?;
        let vocab_size   = tokenizer.get_vocab_size(true);

        let data_dir = self.data_dir.as_deref().unwrap_or(&cfg.data_dir);
        let loader   = TextCorpusLoader::new(data_dir);
        let lines    = match self.split {
            // same carve as training when no valid file exists
            CorpusSplit::Valid => train_and_valid_lines(&loader, cfg.seed)?.1,
            split => match loader.load_split(split)? {
                Some(corpus) => corpus.lines,
                None => bail!("No {split} split found in '{data_dir}'"),
            },
        };

        let dataset = build_dataset(
            &cfg, &tokenizer, specials, &lines, self.split, cfg.eval_batch_size,
        )?;
        if dataset.sample_count() == 0 {
            bail!("The {} split is too short for seq_len {}", self.split, cfg.seq_len);
        }

        let ctx   = default_context::<ComputeBackend>(cfg.seed);
        let model: LanguageModel<ComputeBackend> = cfg.model_config(vocab_size).init(&ctx.device)?;
        let model = ckpt_manager.load_model(model, &ctx.device)?;

        let loader = window_loader::<ComputeBackend>(dataset, &ctx.device);
        let report = evaluate(&model, &loader, cfg.objective, specials.pad)?;

        tracing::info!(
            "{} split: loss {:.4} | ppl {:.2} over {} tokens",
            self.split, report.loss, report.perplexity, report.tokens,
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{
        tests::{tiny_config, write_corpus},
        TrainUseCase,
    };
    use crate::domain::objective::Objective;

    #[test]
    fn test_evaluation_matches_training_report() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        write_corpus(data.path(), true);

        let cfg     = tiny_config(data.path(), ckpt.path(), Objective::Causal);
        let summary = TrainUseCase::new(cfg).execute().unwrap();

        let ckpt_dir = ckpt.path().display().to_string();
        let test = EvaluateUseCase::new(ckpt_dir.clone(), None, CorpusSplit::Test)
            .execute()
            .unwrap();
        let expected = summary.test.unwrap();
        assert_eq!(test.tokens, expected.tokens);
        assert!((test.loss - expected.loss).abs() < 2e-2, "{} vs {}", test.loss, expected.loss);

        let valid = EvaluateUseCase::new(ckpt_dir, None, CorpusSplit::Valid).execute().unwrap();
        assert!(valid.perplexity.is_finite());
    }

    #[test]
    fn test_missing_checkpoint_directory_fails() {
        let dir     = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none").display().to_string();
        assert!(EvaluateUseCase::new(missing, None, CorpusSplit::Test).execute().is_err());
    }

    #[test]
    fn test_absent_test_split_is_reported() {
        let data = tempfile::tempdir().unwrap();
        let ckpt = tempfile::tempdir().unwrap();
        write_corpus(data.path(), true);
        TrainUseCase::new(tiny_config(data.path(), ckpt.path(), Objective::Causal))
            .execute()
            .unwrap();

        let empty_data = tempfile::tempdir().unwrap();
        let err = EvaluateUseCase::new(
            ckpt.path().display().to_string(),
            Some(empty_data.path().display().to_string()),
            CorpusSplit::Test,
        )
        .execute()
        .unwrap_err();
        assert!(err.to_string().contains("No test split"));
    }
}
