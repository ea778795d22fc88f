// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
//   1. `train`    — trains the language model on a corpus
//   2. `evaluate` — loads a checkpoint and reports perplexity
//
// Reference: Rust Book §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "encoder-lm",
    version,
    about = "Train a Transformer encoder language model on a text corpus, then evaluate it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = args.into_config()?;
    tracing::info!("Starting training on corpus in: {}", config.data_dir);
    let checkpoint_dir = config.checkpoint_dir.clone();

    let summary = TrainUseCase::new(config).execute()?;

    for epoch in &summary.epochs {
        println!(
            "Epoch {:>3} | train_loss={:.4} | valid_loss={:.4} | valid_ppl={:.2} | {:.1}s",
            epoch.epoch, epoch.train_loss, epoch.valid.loss, epoch.valid.perplexity, epoch.seconds,
        );
    }
    if let Some(test) = summary.test {
        println!("Test | loss={:.4} | ppl={:.2}", test.loss, test.perplexity);
    }
    println!("Training complete. Checkpoints saved to '{checkpoint_dir}'.");
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let split  = args.split;
    let report = EvaluateUseCase::new(args.checkpoint_dir, args.data_dir, split).execute()?;

    println!(
        "{split} | loss={:.4} | ppl={:.2} | tokens={}",
        report.loss, report.perplexity, report.tokens,
    );
    Ok(())
}
