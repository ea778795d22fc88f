use burn::data::dataset::Dataset;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    masking::TokenMasker,
    stream::{batchify, windows},
};

/// One training window. `targets[i]` is what the model should predict at
/// position `i` of `inputs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LmSample {
    pub inputs:  Vec<u32>,
    pub targets: Vec<u32>,
}

impl LmSample {
    pub fn len(&self) -> usize { self.inputs.len() }
}

/// Window-major samples; consecutive groups of `batch_size` share a length.
pub struct LmDataset {
    samples:    Vec<LmSample>,
    batch_size: usize,
}

impl LmDataset {
    /// Next-token samples: target = the token one step ahead.
    pub fn causal(tokens: &[u32], batch_size: usize, seq_len: usize) -> Self {
        let streams    = batchify(tokens, batch_size);
        let stream_len = streams.first().map_or(0, Vec::len);

        let samples = windows(stream_len, streams.len(), seq_len)
            .into_iter()
            .map(|w| {
                let s = &streams[w.stream];
                LmSample {
                    inputs:  s[w.start..w.start + w.len].to_vec(),
                    targets: s[w.start + 1..w.start + 1 + w.len].to_vec(),
                }
            })
            .collect();

        Self { samples, batch_size }
    }

    /// Masked-token samples over the same windows, corrupted once with `seed`.
    pub fn masked(
        tokens:     &[u32],
        batch_size: usize,
        seq_len:    usize,
        masker:     &TokenMasker,
        seed:       u64,
    ) -> Self {
        let streams    = batchify(tokens, batch_size);
        let stream_len = streams.first().map_or(0, Vec::len);
        let mut rng    = StdRng::seed_from_u64(seed);

        let samples = windows(stream_len, streams.len(), seq_len)
            .into_iter()
            .map(|w| masker.apply(&streams[w.stream][w.start..w.start + w.len], &mut rng))
            .collect();

        Self { samples, batch_size }
    }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Batch size the samples were laid out for.
    pub fn batch_size(&self) -> usize { self.batch_size }

    #[cfg(test)]
    pub fn token_count(&self) -> usize {
        self.samples.iter().map(LmSample::len).sum()
    }
}

impl Dataset<LmSample> for LmDataset {
    fn get(&self, index: usize) -> Option<LmSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_causal_targets_are_shifted_inputs() {
        let tokens: Vec<u32> = (0..20).collect();
        let ds = LmDataset::causal(&tokens, 2, 4);

        // streams: 0..10 and 10..20
        let first = ds.get(0).unwrap();
        assert_eq!(first.inputs,  vec![0, 1, 2, 3]);
        assert_eq!(first.targets, vec![1, 2, 3, 4]);

        let second = ds.get(1).unwrap();
        assert_eq!(second.inputs,  vec![10, 11, 12, 13]);
        assert_eq!(second.targets, vec![11, 12, 13, 14]);
    }

    #[test]
    fn test_consecutive_groups_share_length() {
        let tokens: Vec<u32> = (0..50).collect();
        let ds = LmDataset::causal(&tokens, 3, 7);
        assert_eq!(ds.batch_size(), 3);
        assert_eq!(ds.len() % 3, 0);
        for group in 0..ds.len() / 3 {
            let lens: Vec<usize> = (0..3).map(|c| ds.get(group * 3 + c).unwrap().len()).collect();
            assert!(lens.iter().all(|&l| l == lens[0]));
        }
        assert_eq!(ds.token_count(), 3 * 15);
    }

    #[test]
    fn test_masked_samples_cover_the_windows() {
        let tokens: Vec<u32> = (10..60).collect();
        let masker = TokenMasker::new(2, 1, 3, 100, 0.15);
        let ds     = LmDataset::masked(&tokens, 2, 8, &masker, 5);

        assert_eq!(ds.len(), LmDataset::causal(&tokens, 2, 8).len());
        for i in 0..ds.len() {
            let sample = ds.get(i).unwrap();
            assert_eq!(sample.inputs.len(), sample.targets.len());
            assert!(sample.targets.iter().any(|&t| t != 1));
        }
    }

    #[test]
    fn test_too_few_tokens_gives_empty_dataset() {
        let ds = LmDataset::causal(&[1, 2, 3], 4, 5);
        assert!(ds.is_empty());
    }
}
