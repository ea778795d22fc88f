use burn::{
    nn::{Embedding, EmbeddingConfig, Linear, LinearConfig},
    prelude::*,
    tensor::activation,
};

use crate::ml::{
    attention::ScalePlacement,
    encoder::{Encoder, EncoderConfig},
    error::{ModelError, ModelResult},
};

#[derive(Config, Debug)]
pub struct LanguageModelConfig {
    pub vocab_size:     usize,
    pub d_model:        usize,
    pub num_heads:      usize,
    pub num_blocks:     usize,
    pub max_seq_len:    usize,
    #[config(default = 512)]
    pub hidden_size:    usize,
    #[config(default = 4)]
    pub ffn_num_layers: usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    #[config(default = "ScalePlacement::BeforeSoftmax")]
    pub scale_placement: ScalePlacement,
}

impl LanguageModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<LanguageModel<B>> {
        if self.vocab_size == 0 {
            return Err(ModelError::config("vocab_size must be positive"));
        }

        let encoder = EncoderConfig::new(self.d_model, self.num_heads, self.num_blocks)
            .with_max_seq_len(self.max_seq_len)
            .with_hidden_size(self.hidden_size)
            .with_ffn_num_layers(self.ffn_num_layers)
            .with_dropout(self.dropout)
            .with_scale_placement(self.scale_placement)
            .init(device)?;

        Ok(LanguageModel {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            encoder,
            vocab_head:      LinearConfig::new(self.d_model, self.vocab_size).init(device),
            vocab_size:      self.vocab_size,
        })
    }
}

/// Token embedding → Transformer encoder → per-position vocabulary scores.
#[derive(Module, Debug)]
pub struct LanguageModel<B: Backend> {
    pub token_embedding: Embedding<B>,
    pub encoder:         Encoder<B>,
    pub vocab_head:      Linear<B>,
    pub vocab_size:      usize,
}

impl<B: Backend> LanguageModel<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, vocab_size]
    pub fn forward(
        &self,
        input_ids: Tensor<B, 2, Int>,
        mask:      Option<Tensor<B, 2, Bool>>,
    ) -> ModelResult<Tensor<B, 3>> {
        let embedded = self.token_embedding.forward(input_ids);
        let hidden   = self.encoder.forward(embedded, mask)?;
        Ok(self.vocab_head.forward(hidden))
    }

    /// Mean cross-entropy over the positions whose target is not `ignore_id`.
    ///
    /// targets: [batch * seq_len], batch-major like the flattened logits.
    pub fn forward_loss(
        &self,
        input_ids: Tensor<B, 2, Int>,
        targets:   Tensor<B, 1, Int>,
        mask:      Option<Tensor<B, 2, Bool>>,
        ignore_id: Option<usize>,
    ) -> ModelResult<(Tensor<B, 1>, Tensor<B, 2>)> {
        let [batch_size, seq_len] = input_ids.dims();
        let num_targets = batch_size * seq_len;
        let logits = self
            .forward(input_ids, mask)?
            .reshape([num_targets, self.vocab_size]);

        let log_probs = activation::log_softmax(logits.clone(), 1)
            .gather(1, targets.clone().reshape([num_targets, 1]))
            .reshape([num_targets]);

        // burn's CrossEntropyLoss divides padded losses by the full count;
        // the mean here runs over counted targets only.
        let counted = match ignore_id {
            Some(id) => targets.equal_elem(id as i64).bool_not().float(),
            None     => Tensor::ones([num_targets], &logits.device()),
        };
        let denom = counted.clone().sum().clamp_min(1.0);
        let loss  = (log_probs * counted).sum().neg() / denom;

        Ok((loss, logits))
    }
}

/// Number of targets that `forward_loss` averages over.
pub fn counted_targets<B: Backend>(targets: &Tensor<B, 1, Int>, ignore_id: Option<usize>) -> usize {
    match ignore_id {
        Some(id) => targets
            .clone()
            .equal_elem(id as i64)
            .bool_not()
            .int()
            .sum()
            .into_scalar()
            .elem::<i64>() as usize,
        None => targets.dims()[0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::Autodiff,
        optim::{GradientsParams, Optimizer, SgdConfig},
        tensor::TensorData,
    };

    use crate::ml::mask::causal_attention_mask;

    type TestBackend  = burn::backend::NdArray;
    type TestAutodiff = Autodiff<TestBackend>;

    fn tiny_config() -> LanguageModelConfig {
        LanguageModelConfig::new(11, 8, 2, 1, 6)
            .with_hidden_size(16)
            .with_ffn_num_layers(2)
            .with_dropout(0.0)
    }

    fn ids<B: Backend>(values: Vec<i64>, dims: [usize; 2], device: &B::Device) -> Tensor<B, 2, Int> {
        Tensor::from_data(TensorData::new(values, dims), device)
    }

    #[test]
    fn test_logits_cover_vocabulary() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device).unwrap();
        let input  = ids::<TestBackend>((0..12).map(|v| v % 11).collect(), [2, 6], &device);
        let logits = model.forward(input, None).unwrap();
        assert_eq!(logits.dims(), [2, 6, 11]);
    }

    #[test]
    fn test_zero_vocabulary_is_rejected() {
        let err = LanguageModelConfig::new(0, 8, 2, 1, 6)
            .init::<TestBackend>(&Default::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_sequence_longer_than_max_is_rejected() {
        let device = Default::default();
        let model  = tiny_config().init::<TestBackend>(&device).unwrap();
        let input  = ids::<TestBackend>(vec![1; 7], [1, 7], &device);
        let err    = model.forward(input, None).unwrap_err();
        assert_eq!(err, ModelError::SequenceTooLong { len: 7, max: 6 });
    }

    #[test]
    fn test_sgd_steps_reduce_loss_on_fixed_batch() {
        TestAutodiff::seed(3);
        let device    = Default::default();
        let mut model = tiny_config().init::<TestAutodiff>(&device).unwrap();
        let mut optim = SgdConfig::new().init();

        let input   = ids::<TestAutodiff>(vec![1, 2, 3, 4, 5, 6, 2, 3, 4, 5, 6, 7], [2, 6], &device);
        let targets = Tensor::<TestAutodiff, 1, Int>::from_data(
            TensorData::new(vec![2i64, 3, 4, 5, 6, 7, 3, 4, 5, 6, 7, 8], [12]),
            &device,
        );
        let mask = causal_attention_mask::<TestAutodiff>(6, &device);

        let mut losses = Vec::new();
        for _ in 0..30 {
            let (loss, _) = model
                .forward_loss(input.clone(), targets.clone(), Some(mask.clone()), None)
                .unwrap();
            losses.push(loss.clone().into_scalar().elem::<f32>());

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model     = optim.step(0.5, model, grads);
        }

        assert!(losses.iter().all(|l| l.is_finite()));
        assert!(losses[29] < losses[0], "loss went from {} to {}", losses[0], losses[29]);
    }

    #[test]
    fn test_ignored_targets_change_the_loss() {
        let device  = Default::default();
        let model   = tiny_config().init::<TestBackend>(&device).unwrap();
        let input   = ids::<TestBackend>(vec![1, 2, 3, 4, 5, 6], [1, 6], &device);
        // Only position 2 carries a real target when 0 is ignored.
        let targets = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![0i64, 0, 9, 0, 0, 0], [6]), &device,
        );

        let (ignored, logits) = model.forward_loss(input.clone(), targets.clone(), None, Some(0)).unwrap();
        let (counted, _)      = model.forward_loss(input, targets, None, None).unwrap();
        assert_eq!(logits.dims(), [6, 11]);

        let ignored = ignored.into_scalar().elem::<f32>();
        let counted = counted.into_scalar().elem::<f32>();
        assert!(ignored.is_finite());
        assert!((ignored - counted).abs() > 1e-6);
    }

    #[test]
    fn test_unignored_loss_matches_cross_entropy() {
        let device  = Default::default();
        let model   = tiny_config().init::<TestBackend>(&device).unwrap();
        let input   = ids::<TestBackend>(vec![1, 2, 3, 4, 5, 6], [1, 6], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![2i64, 3, 4, 5, 6, 7], [6]), &device,
        );

        let (loss, logits) = model.forward_loss(input, targets.clone(), None, None).unwrap();
        let reference = burn::nn::loss::CrossEntropyLossConfig::new()
            .init(&device)
            .forward(logits, targets);

        let loss      = loss.into_scalar().elem::<f32>();
        let reference = reference.into_scalar().elem::<f32>();
        assert!((loss - reference).abs() < 1e-5, "{loss} vs {reference}");
    }

    #[test]
    fn test_counted_targets_skip_ignored_id() {
        let device  = Default::default();
        let targets = Tensor::<TestBackend, 1, Int>::from_data(
            TensorData::new(vec![1i64, 4, 1, 7, 1], [5]), &device,
        );
        assert_eq!(counted_targets(&targets, Some(1)), 2);
        assert_eq!(counted_targets(&targets, None), 5);
    }
}
