//! Maximal marginal relevance over a candidate pool.
//!
//! Each step picks the candidate maximizing
//! `lambda * sim(query, c) - (1 - lambda) * max_{s in selected} sim(c, s)`,
//! with cosine similarity. Lambda close to 1.0 prefers relevance; close to
//! 0.0 prefers diversity.

/// Returns indices into `candidates`, in selection order (most relevant first).
///
/// Ties resolve to the lower index, so equal candidates keep their search order.
pub fn mmr_select(query: &[f32], candidates: &[Vec<f32>], k: usize, lambda: f32) -> Vec<usize> {
    let k = k.min(candidates.len());
    if k == 0 {
        return Vec::new();
    }

    let relevance: Vec<f32> = candidates.iter().map(|c| cosine(query, c)).collect();
    let mut selected: Vec<usize> = Vec::with_capacity(k);
    // Highest similarity to anything selected so far, per candidate.
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (i, rel) in relevance.iter().enumerate() {
            if selected.contains(&i) {
                continue;
            }
            let penalty = if selected.is_empty() {
                0.0
            } else {
                redundancy[i]
            };
            let gain = lambda * rel - (1.0 - lambda) * penalty;
            if best.is_none_or(|(_, g)| gain > g) {
                best = Some((i, gain));
            }
        }

        let Some((pick, _)) = best else { break };
        selected.push(pick);
        for (i, c) in candidates.iter().enumerate() {
            redundancy[i] = redundancy[i].max(cosine(c, &candidates[pick]));
        }
    }

    selected
}

pub(crate) fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na.sqrt() * nb.sqrt())
    }
}
