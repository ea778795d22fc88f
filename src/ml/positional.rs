// ============================================================
// Layer 5 — Sinusoidal Positional Encoding
// ============================================================
// Attention has no notion of order, so each position k gets a
// fixed signal added to its embedding:
//
//   table[k, 2i]   = sin(k / n^(2i/d))
//   table[k, 2i+1] = cos(k / n^(2i/d))
//
// The table is computed once on the host and never recorded in
// checkpoints; it is fully determined by (max_len, d, n).
//
// Reference: Vaswani et al. (2017) §3.5

use burn::{prelude::*, tensor::TensorData};

use crate::ml::error::{ModelError, ModelResult};

/// Default frequency base `n`.
pub const DEFAULT_BASE: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionalEncoding {
    table:   Vec<f32>,
    max_len: usize,
    d_model: usize,
}

impl PositionalEncoding {
    /// Build the `[max_len, d_model]` table. With an odd `d_model` the last
    /// column has no sin/cos pair and stays zero.
    pub fn new(max_len: usize, d_model: usize, base: f64) -> Self {
        let mut table = vec![0.0f32; max_len * d_model];

        for k in 0..max_len {
            let row = &mut table[k * d_model..(k + 1) * d_model];
            for i in 0..d_model / 2 {
                let denominator = base.powf((2 * i) as f64 / d_model as f64);
                let angle       = k as f64 / denominator;
                row[2 * i]      = angle.sin() as f32;
                row[2 * i + 1]  = angle.cos() as f32;
            }
        }

        Self { table, max_len, d_model }
    }

    pub fn max_len(&self) -> usize { self.max_len }

    /// Single table entry, mainly for inspection.
    #[cfg(test)]
    pub fn value(&self, position: usize, feature: usize) -> f32 {
        self.table[position * self.d_model + feature]
    }

    /// Rows `[0, seq_len)` of the table.
    pub fn rows(&self, seq_len: usize) -> ModelResult<&[f32]> {
        if seq_len > self.max_len {
            return Err(ModelError::SequenceTooLong { len: seq_len, max: self.max_len });
        }
        Ok(&self.table[..seq_len * self.d_model])
    }

    /// Rows `[0, seq_len)` as a `[seq_len, d_model]` tensor on `device`.
    pub fn slice<B: Backend>(&self, seq_len: usize, device: &B::Device) -> ModelResult<Tensor<B, 2>> {
        let rows = self.rows(seq_len)?;
        let data = TensorData::new(rows.to_vec(), [seq_len, self.d_model]);
        Ok(Tensor::from_data(data, device))
    }
}
