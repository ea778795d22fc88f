// ============================================================
// Layer 5 — Attention Mask Utilities
// ============================================================
// `triangular_mask` produces 0/1 flags with a 1 wherever i <= j:
//
//   s = 3  →  [[1, 1, 1],
//              [0, 1, 1],
//              [0, 0, 1]]
//
// Flag [i, j] = 1 reads as "position i is visible to position j".
// Attention scores are indexed [query, key], so the boolean mask
// the heads consume is the transposed complement:
//
//   blocked[q, k] = flags[k, q] == 0
//
// which for the triangular flags lets every query see itself and
// earlier positions only.

use burn::{prelude::*, tensor::TensorData};

/// `[seq_len, seq_len]` upper-triangular 0/1 flags, diagonal included.
pub fn triangular_mask<B: Backend>(seq_len: usize, device: &B::Device) -> Tensor<B, 2> {
    let mut flags = vec![0.0f32; seq_len * seq_len];
    for i in 0..seq_len {
        for j in i..seq_len {
            flags[i * seq_len + j] = 1.0;
        }
    }
    Tensor::from_data(TensorData::new(flags, [seq_len, seq_len]), device)
}

/// Turn visibility flags into the `[query, key]` mask the heads expect
/// (`true` = blocked).
pub fn attention_mask_from_flags<B: Backend>(flags: Tensor<B, 2>) -> Tensor<B, 2, Bool> {
    flags.transpose().equal_elem(0.0)
}

/// Mask that restricts every position to itself and its predecessors.
pub fn causal_attention_mask<B: Backend>(seq_len: usize, device: &B::Device) -> Tensor<B, 2, Bool> {
    attention_mask_from_flags(triangular_mask::<B>(seq_len, device))
}
