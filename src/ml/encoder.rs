// ============================================================
// Layer 5 — Transformer Encoder
// ============================================================
// EncoderBlock (post-norm):
//
//   z1  = MultiHeadAttention(x)
//   z2  = LayerNorm(x + z1)
//   z3  = FeedForward(z2)
//   out = LayerNorm(z2 + z3)
//
// Encoder: the positional table is added once to the input,
// then N blocks run in sequence. Shapes are checked at the
// Encoder boundary; blocks assume a well-formed tensor.
//
// Reference: Vaswani et al. (2017) §3.1
//            Devlin et al. (2019) BERT

use burn::{
    module::Ignored,
    nn::{LayerNorm, LayerNormConfig},
    prelude::*,
};

use crate::ml::{
    attention::{MultiHeadAttention, MultiHeadAttentionConfig, ScalePlacement},
    error::{ModelError, ModelResult},
    feed_forward::{FeedForward, FeedForwardConfig},
    positional::PositionalEncoding,
};

// ─── EncoderBlock ─────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct EncoderBlockConfig {
    pub d_model:   usize,
    pub num_heads: usize,
    #[config(default = 512)]
    pub hidden_size:    usize,
    #[config(default = 4)]
    pub ffn_num_layers: usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    #[config(default = "ScalePlacement::BeforeSoftmax")]
    pub scale_placement: ScalePlacement,
}

impl EncoderBlockConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<EncoderBlock<B>> {
        if self.d_model == 0 {
            return Err(ModelError::config("model width must be positive"));
        }

        let attention = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_scale_placement(self.scale_placement)
            .init(device)?;
        let feed_forward = FeedForwardConfig::new(self.d_model, self.hidden_size, self.d_model)
            .with_num_layers(self.ffn_num_layers)
            .with_dropout(self.dropout)
            .init(device)?;

        Ok(EncoderBlock {
            attention,
            feed_forward,
            norm_attention: LayerNormConfig::new(self.d_model).init(device),
            norm_output:    LayerNormConfig::new(self.d_model).init(device),
        })
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    attention:      MultiHeadAttention<B>,
    feed_forward:   FeedForward<B>,
    norm_attention: LayerNorm<B>,
    norm_output:    LayerNorm<B>,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, seq, d] → [batch, seq, d]
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> Tensor<B, 3> {
        let attended = self.attention.forward(x.clone(), mask);
        let x        = self.norm_attention.forward(x + attended);
        let fed      = self.feed_forward.forward(x.clone());
        self.norm_output.forward(x + fed)
    }
}

// ─── Encoder ──────────────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub d_model:    usize,
    pub num_heads:  usize,
    pub num_blocks: usize,
    #[config(default = 512)]
    pub max_seq_len:    usize,
    #[config(default = 512)]
    pub hidden_size:    usize,
    #[config(default = 4)]
    pub ffn_num_layers: usize,
    #[config(default = 0.1)]
    pub dropout:        f64,
    #[config(default = "ScalePlacement::BeforeSoftmax")]
    pub scale_placement: ScalePlacement,
    #[config(default = 10000.0)]
    pub positional_base: f64,
}

impl EncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ModelResult<Encoder<B>> {
        self.validate()?;

        let block_cfg = EncoderBlockConfig::new(self.d_model, self.num_heads)
            .with_hidden_size(self.hidden_size)
            .with_ffn_num_layers(self.ffn_num_layers)
            .with_dropout(self.dropout)
            .with_scale_placement(self.scale_placement);
        let blocks = (0..self.num_blocks)
            .map(|_| block_cfg.init(device))
            .collect::<ModelResult<Vec<_>>>()?;

        let positional = PositionalEncoding::new(self.max_seq_len, self.d_model, self.positional_base);

        tracing::debug!(
            "Encoder built: {} blocks × {} heads, d_model={}, max_seq_len={}",
            self.num_blocks, self.num_heads, self.d_model, self.max_seq_len,
        );

        Ok(Encoder {
            blocks,
            positional: Ignored(positional),
            d_model:    self.d_model,
        })
    }

    fn validate(&self) -> ModelResult<()> {
        if self.d_model == 0 {
            return Err(ModelError::config("model width must be positive"));
        }
        if self.num_heads == 0 {
            return Err(ModelError::config("num_heads must be positive"));
        }
        if self.num_blocks == 0 {
            return Err(ModelError::config("num_blocks must be positive"));
        }
        if self.max_seq_len == 0 {
            return Err(ModelError::config("max_seq_len must be positive"));
        }
        if !(self.positional_base > 0.0) {
            return Err(ModelError::config("positional base must be positive"));
        }
        Ok(())
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    blocks:     Vec<EncoderBlock<B>>,
    positional: Ignored<PositionalEncoding>,
    d_model:    usize,
}

impl<B: Backend> Encoder<B> {
    /// x: [batch, seq, d] → [batch, seq, d]
    ///
    /// `mask`, when given, must be `[seq, seq]` with `true` marking the
    /// (query, key) pairs that may not attend.
    pub fn forward(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> ModelResult<Tensor<B, 3>> {
        let mut z = self.embed_positions(x, mask.as_ref())?;
        for block in &self.blocks {
            z = block.forward(z, mask.clone());
        }
        Ok(z)
    }

    /// Unbatched entry point: x: [seq, d] → [seq, d]
    #[allow(dead_code)]
    pub fn forward_sequence(&self, x: Tensor<B, 2>, mask: Option<Tensor<B, 2, Bool>>) -> ModelResult<Tensor<B, 2>> {
        let [seq_len, width] = x.dims();
        let out = self.forward(x.unsqueeze::<3>(), mask)?;
        Ok(out.reshape([seq_len, width]))
    }

    /// Output of every block in order; the last entry equals `forward`.
    #[allow(dead_code)]
    pub fn hidden_states(&self, x: Tensor<B, 3>, mask: Option<Tensor<B, 2, Bool>>) -> ModelResult<Vec<Tensor<B, 3>>> {
        let mut z      = self.embed_positions(x, mask.as_ref())?;
        let mut states = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            z = block.forward(z, mask.clone());
            states.push(z.clone());
        }
        Ok(states)
    }

    pub fn num_blocks(&self) -> usize { self.blocks.len() }

    pub fn d_model(&self) -> usize { self.d_model }

    pub fn max_seq_len(&self) -> usize { self.positional.0.max_len() }

    fn embed_positions(&self, x: Tensor<B, 3>, mask: Option<&Tensor<B, 2, Bool>>) -> ModelResult<Tensor<B, 3>> {
        let [batch, seq_len, width] = x.dims();

        if batch == 0 || seq_len == 0 {
            return Err(ModelError::EmptySequence);
        }
        if width != self.d_model {
            return Err(ModelError::WidthMismatch { expected: self.d_model, actual: width });
        }
        if let Some(mask) = mask {
            let dims = mask.dims();
            if dims != [seq_len, seq_len] {
                return Err(ModelError::MaskShapeMismatch { expected: seq_len, actual: dims });
            }
        }

        let pe = self.positional.0.slice::<B>(seq_len, &x.device())?;
        Ok(x + pe.unsqueeze::<3>().expand([batch, seq_len, width]))
    }
}
