// ============================================================
// Layer 4 — Masked-Token Corruption (BERT objective)
// ============================================================
// For every position, with probability `mask_prob`:
//
//   target = original token
//   input  = <mask>          80% of the time
//            random token    10%
//            unchanged       10%
//
// Unselected positions get target = <pad>, which the loss
// ignores. A window with no selected position gets one forced
// selection so every sample contributes to the loss.
//
// Reference: Devlin et al. (2019) §3.1

use rand::Rng;

use crate::data::dataset::LmSample;

#[derive(Debug, Clone, PartialEq)]
pub struct TokenMasker {
    pub mask_id:    u32,
    pub pad_id:     u32,
    /// First id that is a regular word; random replacements come from
    /// `[first_word_id, vocab_size)`.
    pub first_word_id: u32,
    pub vocab_size: u32,
    pub mask_prob:  f64,
}

impl TokenMasker {
    pub fn new(mask_id: u32, pad_id: u32, first_word_id: u32, vocab_size: u32, mask_prob: f64) -> Self {
        Self { mask_id, pad_id, first_word_id, vocab_size, mask_prob }
    }

    /// Corrupt `tokens` into an (inputs, targets) sample.
    pub fn apply<R: Rng + ?Sized>(&self, tokens: &[u32], rng: &mut R) -> LmSample {
        let mut inputs  = tokens.to_vec();
        let mut targets = vec![self.pad_id; tokens.len()];

        let mut selected: Vec<usize> = (0..tokens.len())
            .filter(|_| rng.gen_bool(self.mask_prob.clamp(0.0, 1.0)))
            .collect();
        if selected.is_empty() && !tokens.is_empty() {
            selected.push(rng.gen_range(0..tokens.len()));
        }

        for pos in selected {
            targets[pos] = tokens[pos];
            let roll: f64 = rng.gen();
            if roll < 0.8 {
                inputs[pos] = self.mask_id;
            } else if roll < 0.9 && self.first_word_id < self.vocab_size {
                inputs[pos] = rng.gen_range(self.first_word_id..self.vocab_size);
            }
        }

        LmSample { inputs, targets }
    }
}
