// ============================================================
// Layer 5 — Self-Attention
// ============================================================
// AttentionHead: one scaled dot-product unit with its own
// d → d projections for queries, keys and values.
//
//   Q = X·W_q   K = X·W_k   V = X·W_v          [batch, seq, d]
//   A = softmax(Q·Kᵀ / √d_k)                   [batch, seq, seq]
//   Z = A·V                                     [batch, seq, d]
//
// MultiHeadAttention: H heads over the same input, outputs
// concatenated on the feature axis to [batch, seq, H·d] and
// merged back to d by one projection.
//
// Reference: Vaswani et al. (2017) §3.2

use burn::{
    module::Ignored,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::activation::softmax,
};

use crate::ml::error::{ModelError, ModelResult};

/// Where the `1/√d_k` scaling is applied relative to the softmax.
#[derive(Config, Debug, PartialEq, Copy)]
pub enum ScalePlacement {
    /// `softmax(Q·Kᵀ / √d_k)`; rows of the weight matrix sum to 1.
    BeforeSoftmax,
    /// `softmax(Q·Kᵀ) / √d_k`; rows sum to `1/√d_k`.
    AfterSoftmax,
}

// ─── AttentionHead ────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct AttentionHeadConfig {
    pub d_model: usize,
    #[config(default = "ScalePlacement::BeforeSoftmax")]
    pub scale_placement: ScalePlacement,
}

impl AttentionHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<AttentionHead<B>> {
        if self.d_model == 0 {
            return Err(ModelError::config("attention head width must be positive"));
        }
        Ok(AttentionHead {
            query:           LinearConfig::new(self.d_model, self.d_model).init(device),
            key:             LinearConfig::new(self.d_model, self.d_model).init(device),
            value:           LinearConfig::new(self.d_model, self.d_model).init(device),
            scale_placement: Ignored(self.scale_placement),
            d_k:             self.d_model,
        })
    }
}

#[derive(Module, Debug)]
pub struct AttentionHead<B: Backend> {
    query:           Linear<B>,
    key:             Linear<B>,
    value:           Linear<B>,
    scale_placement: Ignored<ScalePlacement>,
    d_k:             usize,
}

impl<B: Backend> AttentionHead<B> {
    /// x: [batch, seq, d] → [batch, seq, d]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let q = self.query.forward(x.clone());
        let k = self.key.forward(x.clone());
        let v = self.value.forward(x);
        self.weights(q, k, mask).matmul(v)
    }

    /// The `[batch, seq, seq]` weight matrix this head would apply to `x`.
    pub fn attention_weights(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let q = self.query.forward(x.clone());
        let k = self.key.forward(x);
        self.weights(q, k, mask)
    }

    fn weights(&self, q: Tensor<B, 3>, k: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = q.dims();
        let scale = (self.d_k as f64).sqrt();

        let mut scores = q.matmul(k.swap_dims(1, 2));
        if self.scale_placement.0 == ScalePlacement::BeforeSoftmax {
            scores = scores.div_scalar(scale);
        }

        // Blocked keys get -inf so they vanish after the exponential.
        if let Some(mask) = mask {
            let mask = mask.unsqueeze::<3>().expand([batch, seq_len, seq_len]);
            scores = scores.mask_fill(mask, f32::NEG_INFINITY);
        }

        let weights = softmax(scores, 2);
        match self.scale_placement.0 {
            ScalePlacement::BeforeSoftmax => weights,
            ScalePlacement::AfterSoftmax  => weights.div_scalar(scale),
        }
    }
}

// ─── MultiHeadAttention ───────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct MultiHeadAttentionConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    #[config(default = "ScalePlacement::BeforeSoftmax")]
    pub scale_placement: ScalePlacement,
}

impl MultiHeadAttentionConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<MultiHeadAttention<B>> {
        if self.num_heads == 0 {
            return Err(ModelError::config("multi-head attention needs at least one head"));
        }

        let head_cfg = AttentionHeadConfig::new(self.d_model)
            .with_scale_placement(self.scale_placement);
        let heads = (0..self.num_heads)
            .map(|_| head_cfg.init(device))
            .collect::<ModelResult<Vec<_>>>()?;

        // The merge input width is H·d by construction.
        let merge = LinearConfig::new(self.num_heads * self.d_model, self.d_model).init(device);

        Ok(MultiHeadAttention { heads, merge })
    }
}

#[derive(Module, Debug)]
pub struct MultiHeadAttention<B: Backend> {
    heads: Vec<AttentionHead<B>>,
    merge: Linear<B>,
}

impl<B: Backend> MultiHeadAttention<B> {
    /// x: [batch, seq, d] → [batch, seq, d]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let outputs: Vec<Tensor<B, 3>> = self
            .heads
            .iter()
            .map(|head| head.forward(x.clone(), mask.clone()))
            .collect();

        self.merge.forward(Tensor::cat(outputs, 2))
    }

    /// Per-head attention weights, in head order.
    #[allow(dead_code)]
    pub fn attention_weights(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Vec<Tensor<B, 3>> {
        self.heads
            .iter()
            .map(|head| head.attention_weights(x.clone(), mask.clone()))
            .collect()
    }

    #[allow(dead_code)]
    pub fn num_heads(&self) -> usize {
        self.heads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::Distribution;

    use crate::ml::mask::causal_attention_mask;

    type TestBackend = burn::backend::NdArray;

    fn random_input(dims: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::random(dims, Distribution::Normal(0.0, 1.0), &Default::default())
    }

    fn max_abs_diff(a: Tensor<TestBackend, 3>, b: Tensor<TestBackend, 3>) -> f32 {
        (a - b).abs().max().into_scalar().elem::<f32>()
    }

    fn row_sums(weights: Tensor<TestBackend, 3>) -> Vec<f32> {
        weights.sum_dim(2).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_head_preserves_shape() {
        let device = Default::default();
        let head   = AttentionHeadConfig::new(8).init::<TestBackend>(&device).unwrap();
        let out    = head.forward(random_input([2, 5, 8]), None);
        assert_eq!(out.dims(), [2, 5, 8]);
    }

    #[test]
    fn test_weights_are_row_stochastic() {
        let device  = Default::default();
        let head    = AttentionHeadConfig::new(8).init::<TestBackend>(&device).unwrap();
        let weights = head.attention_weights(random_input([2, 6, 8]), None);
        assert_eq!(weights.dims(), [2, 6, 6]);
        for sum in row_sums(weights) {
            assert!((sum - 1.0).abs() < 1e-5, "row sum {sum}");
        }
    }

    #[test]
    fn test_scaling_after_softmax_shrinks_rows() {
        let device  = Default::default();
        let head    = AttentionHeadConfig::new(16)
            .with_scale_placement(ScalePlacement::AfterSoftmax)
            .init::<TestBackend>(&device)
            .unwrap();
        let weights = head.attention_weights(random_input([1, 4, 16]), None);
        // 1 / √16
        for sum in row_sums(weights) {
            assert!((sum - 0.25).abs() < 1e-5, "row sum {sum}");
        }
    }

    #[test]
    fn test_causal_mask_zeroes_future_weights() {
        let device  = Default::default();
        let head    = AttentionHeadConfig::new(4).init::<TestBackend>(&device).unwrap();
        let mask    = causal_attention_mask::<TestBackend>(3, &device);
        let weights = head
            .attention_weights(random_input([1, 3, 4]), Some(mask))
            .into_data()
            .to_vec::<f32>()
            .unwrap();

        // [query, key] with key > query blocked
        assert_eq!(weights[1], 0.0);
        assert_eq!(weights[2], 0.0);
        assert_eq!(weights[5], 0.0);
        // first query can only see itself
        assert!((weights[0] - 1.0).abs() < 1e-6);
        for row in weights.chunks(3) {
            assert!((row.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_multi_head_preserves_shape() {
        let device = Default::default();
        let mha    = MultiHeadAttentionConfig::new(8, 3).init::<TestBackend>(&device).unwrap();
        assert_eq!(mha.num_heads(), 3);
        assert_eq!(mha.forward(random_input([2, 7, 8]), None).dims(), [2, 7, 8]);
        assert_eq!(mha.attention_weights(random_input([2, 7, 8]), None).len(), 3);
    }

    #[test]
    fn test_single_head_is_head_then_merge() {
        let device   = Default::default();
        let mha      = MultiHeadAttentionConfig::new(6, 1).init::<TestBackend>(&device).unwrap();
        let x        = random_input([2, 4, 6]);
        let expected = mha.merge.forward(mha.heads[0].forward(x.clone(), None));
        assert!(max_abs_diff(mha.forward(x, None), expected) < 1e-6);
    }

    #[test]
    fn test_multi_head_is_permutation_equivariant() {
        let device  = Default::default();
        let mha     = MultiHeadAttentionConfig::new(8, 2).init::<TestBackend>(&device).unwrap();
        let x       = random_input([1, 5, 8]);
        let perm    = Tensor::<TestBackend, 1, Int>::from_ints([3, 0, 4, 1, 2], &device);

        let permuted_then_attend = mha.forward(x.clone().select(1, perm.clone()), None);
        let attend_then_permute  = mha.forward(x, None).select(1, perm);
        assert!(max_abs_diff(permuted_then_attend, attend_then_permute) < 1e-4);
    }

    #[test]
    fn test_zero_heads_is_config_error() {
        let device = Default::default();
        let err    = MultiHeadAttentionConfig::new(8, 0).init::<TestBackend>(&device).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_width_is_config_error() {
        let device = Default::default();
        let err    = AttentionHeadConfig::new(0).init::<TestBackend>(&device).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
