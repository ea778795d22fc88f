// ============================================================
// Layer 4 — Language-Model Batcher
// ============================================================
// Implements Burn's Batcher trait: a Vec<LmSample> of equal
// length sequences becomes
//
//   inputs:  [batch, seq]     Int
//   targets: [batch * seq]    Int, batch-major
//
// matching the [batch * seq, vocab] layout of the flattened
// logits in LanguageModel::forward_loss.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
    tensor::TensorData,
};

use crate::data::dataset::LmSample;

#[derive(Debug, Clone)]
pub struct LmBatch<B: Backend> {
    pub inputs:  Tensor<B, 2, Int>,
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> LmBatch<B> {
    pub fn seq_len(&self) -> usize {
        self.inputs.dims()[1]
    }

    /// Number of predicted positions in the batch.
    #[cfg(test)]
    pub fn num_tokens(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Holds the target device so tensors are created on the right GPU/CPU.
#[derive(Clone, Debug)]
pub struct LmBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> LmBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<LmSample, LmBatch<B>> for LmBatcher<B> {
    fn batch(&self, items: Vec<LmSample>) -> LmBatch<B> {
        let batch_size = items.len();
        // The dataset lays samples out so a batch never mixes lengths.
        let seq_len    = items.iter().map(LmSample::len).min().unwrap_or(0);

        let inputs: Vec<i64> = items
            .iter()
            .flat_map(|s| s.inputs[..seq_len].iter().map(|&t| t as i64))
            .collect();
        let targets: Vec<i64> = items
            .iter()
            .flat_map(|s| s.targets[..seq_len].iter().map(|&t| t as i64))
            .collect();

        let inputs = Tensor::<B, 2, Int>::from_data(
            TensorData::new(inputs, [batch_size, seq_len]),
            &self.device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(targets, [batch_size * seq_len]),
            &self.device,
        );

        LmBatch { inputs, targets }
    }
}
