//! Cosine similarity and brute-force top-k ranking.

use ragchat_core::document::{Chunk, RetrievedChunk};
use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 for empty, zero-norm, or mismatched-length input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Score every entry against `query` and keep the best `top_k`.
///
/// Ties are broken by chunk id so results are deterministic.
pub fn rank_by_similarity<'a, I>(entries: I, query: &[f32], top_k: usize) -> Vec<RetrievedChunk>
where
    I: IntoIterator<Item = (&'a Chunk, &'a [f32])>,
{
    let mut scored: Vec<(f32, &Chunk)> = entries
        .into_iter()
        .map(|(chunk, vector)| (cosine_similarity(vector, query), chunk))
        .collect();

    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(score, chunk)| RetrievedChunk {
            id: chunk.id.clone(),
            content: chunk.content.clone(),
            score,
            metadata: chunk.metadata.clone(),
        })
        .collect()
}
