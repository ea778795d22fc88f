// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `evaluate`, and all
// their flags. `train --config run.json` reads the whole run
// configuration from a file instead of the flags.
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::domain::{corpus::CorpusSplit, objective::Objective};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the encoder language model on a text corpus
    Train(TrainArgs),

    /// Report loss and perplexity of the latest checkpoint
    Evaluate(EvaluateArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// JSON run configuration; when given, the other flags are ignored
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory with wiki.{train,valid,test}.tokens
    #[arg(long, default_value = "data/wikitext-2")]
    pub data_dir: String,

    /// Directory to save model checkpoints and tokenizer
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Tokens per training window (also the model's maximum length)
    #[arg(long, default_value_t = 35)]
    pub seq_len: usize,

    #[arg(long, default_value_t = 20)]
    pub train_batch_size: usize,

    #[arg(long, default_value_t = 10)]
    pub eval_batch_size: usize,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Constant SGD learning rate
    #[arg(long, default_value_t = 5.0)]
    pub lr: f64,

    /// Gradient-norm clipping threshold; 0 disables clipping
    #[arg(long, default_value_t = 0.5)]
    pub grad_clip: f64,

    /// Batches between progress lines
    #[arg(long, default_value_t = 200)]
    pub log_interval: usize,

    /// Model width; every head projects at full width
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    #[arg(long, default_value_t = 2)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_blocks: usize,

    /// Hidden width of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub hidden_size: usize,

    /// Linear layers in the feed-forward network (at least 2)
    #[arg(long, default_value_t = 4)]
    pub ffn_num_layers: usize,

    #[arg(long, default_value_t = 0.2)]
    pub dropout: f64,

    /// causal (next token) or masked (BERT-style)
    #[arg(long, default_value = "causal")]
    pub objective: Objective,

    /// Selection probability per position for the masked objective
    #[arg(long, default_value_t = 0.15)]
    pub mask_prob: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Cap on vocabulary size, special tokens included
    #[arg(long)]
    pub max_vocab: Option<usize>,

    /// Divide attention weights by √d after the softmax instead of
    /// scaling the scores before it
    #[arg(long)]
    pub scale_after_softmax: bool,
}

impl TrainArgs {
    /// Config file if one was given, otherwise the flags.
    pub fn into_config(mut self) -> Result<TrainConfig> {
        match self.config.take() {
            Some(path) => {
                tracing::info!("Reading run configuration from '{}'", path.display());
                TrainConfig::from_json_file(&path)
            }
            None => Ok(self.into()),
        }
    }
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:            a.data_dir,
            checkpoint_dir:      a.checkpoint_dir,
            seq_len:             a.seq_len,
            train_batch_size:    a.train_batch_size,
            eval_batch_size:     a.eval_batch_size,
            epochs:              a.epochs,
            lr:                  a.lr,
            grad_clip:           a.grad_clip,
            log_interval:        a.log_interval,
            d_model:             a.d_model,
            num_heads:           a.num_heads,
            num_blocks:          a.num_blocks,
            hidden_size:         a.hidden_size,
            ffn_num_layers:      a.ffn_num_layers,
            dropout:             a.dropout,
            objective:           a.objective,
            mask_prob:           a.mask_prob,
            seed:                a.seed,
            max_vocab:           a.max_vocab,
            scale_after_softmax: a.scale_after_softmax,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Corpus directory; defaults to the one used for training
    #[arg(long)]
    pub data_dir: Option<String>,

    /// valid or test
    #[arg(long, default_value = "test")]
    pub split: CorpusSplit,
}
