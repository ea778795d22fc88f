// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and SGD.
//
//   - Training runs on an AutodiffBackend for gradients
//   - model.valid() returns the model on B::InnerBackend with
//     dropout off; validation/test loaders use that backend too
//   - causal objective: every batch gets a causal attention mask
//     sized to its sequence length
//   - masked objective: bidirectional attention, <pad> targets
//     are left out of the loss
//
// Gradient-norm clipping is configured on the optimizer; the
// learning rate stays constant for the whole run.
//
// Reference: Burn Book §5

use std::{sync::Arc, time::Instant};

use anyhow::{anyhow, Result};
use burn::{
    data::{
        dataloader::{DataLoader, DataLoaderBuilder},
        dataset::Dataset,
    },
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{LmBatch, LmBatcher},
    dataset::LmDataset,
};
use crate::domain::objective::Objective;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{default_context, TrainingBackend},
    mask::causal_attention_mask,
    model::{counted_targets, LanguageModel},
};

/// Loss over a whole split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    /// Token-weighted mean cross-entropy.
    pub loss:       f64,
    pub perplexity: f64,
    /// Targets the loss was averaged over.
    pub tokens:     usize,
}

impl EvalReport {
    fn from_totals(loss_sum: f64, tokens: usize) -> Self {
        let loss = if tokens > 0 { loss_sum / tokens as f64 } else { f64::NAN };
        Self { loss, perplexity: loss.exp(), tokens }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpochReport {
    pub epoch:      usize,
    pub train_loss: f64,
    pub valid:      EvalReport,
    pub seconds:    f64,
}

#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub epochs: Vec<EpochReport>,
    pub test:   Option<EvalReport>,
}

/// Datasets for one training run. `test` is evaluated once at the end.
pub struct TrainingData {
    pub train: LmDataset,
    pub valid: LmDataset,
    pub test:  Option<LmDataset>,
}

/// Target id the loss skips for `objective`.
pub fn ignore_id(objective: Objective, pad_id: u32) -> Option<usize> {
    match objective {
        Objective::Causal => None,
        Objective::Masked => Some(pad_id as usize),
    }
}

fn attention_mask<B: Backend>(
    objective: Objective,
    seq_len:   usize,
    device:    &B::Device,
) -> Option<Tensor<B, 2, Bool>> {
    objective
        .needs_causal_mask()
        .then(|| causal_attention_mask::<B>(seq_len, device))
}

/// Build a loader that keeps the dataset's window-major order.
///
/// Batches use the size the samples were laid out for, so every batch
/// holds windows of one length.
pub fn window_loader<B: Backend>(
    dataset: LmDataset,
    device:  &B::Device,
) -> Arc<dyn DataLoader<LmBatch<B>>> {
    let batch_size = dataset.batch_size().max(1);
    DataLoaderBuilder::new(LmBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .build(dataset)
}

/// Run the model over every batch and average the loss per target.
pub fn evaluate<B: Backend>(
    model:     &LanguageModel<B>,
    loader:    &Arc<dyn DataLoader<LmBatch<B>>>,
    objective: Objective,
    pad_id:    u32,
) -> Result<EvalReport> {
    let ignore   = ignore_id(objective, pad_id);
    let mut loss_sum = 0.0f64;
    let mut tokens   = 0usize;

    for batch in loader.iter() {
        let device = batch.inputs.device();
        let mask   = attention_mask::<B>(objective, batch.seq_len(), &device);
        let count  = counted_targets(&batch.targets, ignore);
        if count == 0 {
            continue;
        }

        let (loss, _) = model.forward_loss(batch.inputs, batch.targets, mask, ignore)?;
        loss_sum += loss.into_scalar().elem::<f64>() * count as f64;
        tokens   += count;
    }

    Ok(EvalReport::from_totals(loss_sum, tokens))
}

pub fn run_training(
    cfg:          &TrainConfig,
    vocab_size:   usize,
    pad_id:       u32,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
) -> Result<TrainSummary> {
    let ctx = default_context::<TrainingBackend>(cfg.seed);
    tracing::info!("Using device: {:?}", ctx.device);
    train_loop::<TrainingBackend>(cfg, vocab_size, pad_id, data, ckpt_manager, ctx.device)
}

fn train_loop<B: AutodiffBackend>(
    cfg:          &TrainConfig,
    vocab_size:   usize,
    pad_id:       u32,
    data:         TrainingData,
    ckpt_manager: &CheckpointManager,
    device:       B::Device,
) -> Result<TrainSummary> {
    if data.train.is_empty() {
        return Err(anyhow!(
            "Training split yields no windows (batch size {}, seq_len {})",
            cfg.train_batch_size, cfg.seq_len,
        ));
    }

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: LanguageModel<B> = cfg.model_config(vocab_size).init(&device)?;
    tracing::info!(
        "Model ready: {} blocks, {} heads, d_model={}, vocab={}",
        cfg.num_blocks, cfg.num_heads, cfg.d_model, vocab_size,
    );

    // ── SGD with gradient-norm clipping ───────────────────────────────────────
    let clipping  = (cfg.grad_clip > 0.0).then(|| GradientClippingConfig::Norm(cfg.grad_clip as f32));
    let mut optim = SgdConfig::new().with_gradient_clipping(clipping).init();

    let ignore      = ignore_id(cfg.objective, pad_id);
    let num_batches = data.train.sample_count() / data.train.batch_size().max(1);

    // ── Loaders: training on B, evaluation on B::InnerBackend ─────────────────
    let train_loader = window_loader::<B>(data.train, &device);
    let valid_loader = window_loader::<B::InnerBackend>(data.valid, &device);
    let test_loader  = data
        .test
        .map(|test| window_loader::<B::InnerBackend>(test, &device));

    let mut epochs = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let epoch_start = Instant::now();
        let mut interval_start = Instant::now();
        let mut interval_loss  = 0.0f64;
        let mut epoch_loss     = 0.0f64;
        let mut batches        = 0usize;

        for batch in train_loader.iter() {
            let mask = attention_mask::<B>(cfg.objective, batch.seq_len(), &device);
            let (loss, _) = model.forward_loss(batch.inputs, batch.targets, mask, ignore)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            interval_loss += loss_val;
            epoch_loss    += loss_val;
            batches       += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            if cfg.log_interval > 0 && batches % cfg.log_interval == 0 {
                let cur_loss = interval_loss / cfg.log_interval as f64;
                let ms       = interval_start.elapsed().as_secs_f64() * 1000.0 / cfg.log_interval as f64;
                tracing::info!(
                    "| epoch {:>3} | {:>5}/{:>5} batches | lr {:.2} | ms/batch {:>7.2} | loss {:>5.2} | ppl {:>8.2}",
                    epoch, batches, num_batches, cfg.lr, ms, cur_loss, cur_loss.exp(),
                );
                interval_loss  = 0.0;
                interval_start = Instant::now();
            }
        }

        let train_loss = if batches > 0 { epoch_loss / batches as f64 } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let valid       = evaluate(&model_valid, &valid_loader, cfg.objective, pad_id)?;
        let seconds     = epoch_start.elapsed().as_secs_f64();

        tracing::info!(
            "| end of epoch {:>3} | time: {:>5.2}s | valid loss {:>5.2} | valid ppl {:>8.2}",
            epoch, seconds, valid.loss, valid.perplexity,
        );

        ckpt_manager.save_model(&model, epoch)?;
        tracing::info!("Checkpoint saved for epoch {}", epoch);

        epochs.push(EpochReport { epoch, train_loss, valid, seconds });
    }

    let test = match &test_loader {
        Some(loader) => {
            let report = evaluate(&model.valid(), loader, cfg.objective, pad_id)?;
            tracing::info!(
                "| End of training | test loss {:>5.2} | test ppl {:>8.2}",
                report.loss, report.perplexity,
            );
            Some(report)
        }
        None => None,
    };

    tracing::info!("Training complete!");
    Ok(TrainSummary { epochs, test })
}
