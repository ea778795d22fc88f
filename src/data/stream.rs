// ============================================================
// Layer 4 — Token Streams and Windows
// ============================================================
// Turns a corpus into fixed-length training windows:
//
//   lines ──encode──▶ one flat token stream   [N]
//         ──batchify(b)──▶ b parallel streams [b][N / b]
//         ──windows(s)──▶ samples of ≤ s tokens
//
// batchify drops the N mod b tail tokens. Stream c is the
// contiguous slice [c·L, (c+1)·L) of the flat stream, so each
// stream keeps running text order.
//
// windows walks positions i = 0, s, 2s, … < L - 1; the window at
// i has length min(s, L - 1 - i) so the next-token target i+len
// always exists. Samples come out window-major:
//
//   [w0/c0, w0/c1, …, w0/c(b-1), w1/c0, …]
//
// so every run of b consecutive samples has equal length and
// forms one batch.

use anyhow::{anyhow, Result};
use tokenizers::Tokenizer;

/// Encode `lines` into one flat stream, skipping lines that produce no tokens.
pub fn encode_corpus(tokenizer: &Tokenizer, lines: &[String]) -> Result<Vec<u32>> {
    let encodings = tokenizer
        .encode_batch(lines.to_vec(), false)
        .map_err(|e| anyhow!("Tokenisation error: {e}"))?;

    let stream: Vec<u32> = encodings
        .iter()
        .filter(|enc| !enc.get_ids().is_empty())
        .flat_map(|enc| enc.get_ids().iter().copied())
        .collect();

    tracing::debug!("Encoded {} lines into {} tokens", lines.len(), stream.len());
    Ok(stream)
}

/// Split `tokens` into `batch_size` equal contiguous streams.
pub fn batchify(tokens: &[u32], batch_size: usize) -> Vec<Vec<u32>> {
    if batch_size == 0 {
        return Vec::new();
    }
    let stream_len = tokens.len() / batch_size;
    (0..batch_size)
        .map(|c| tokens[c * stream_len..(c + 1) * stream_len].to_vec())
        .collect()
}

/// One window of one stream: `[start, start + len)` plus its shifted target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub stream: usize,
    pub start:  usize,
    pub len:    usize,
}

/// Window coordinates in window-major order (see module header).
pub fn windows(stream_len: usize, num_streams: usize, seq_len: usize) -> Vec<Window> {
    let mut out = Vec::new();
    if seq_len == 0 || stream_len < 2 {
        return out;
    }

    let mut start = 0;
    while start < stream_len - 1 {
        let len = seq_len.min(stream_len - 1 - start);
        for stream in 0..num_streams {
            out.push(Window { stream, start, len });
        }
        start += seq_len;
    }
    out
}
