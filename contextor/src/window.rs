//! Context window expansion around retrieval hits.
//!
//! A hit at index `i` pulls in every stored record with
//! `i - m*k <= idx <= i + m*k` (lower bound saturating at 0), drops the
//! primary interlocutor's own messages, and joins the rest with `"\n"`.
//! The output holds exactly one block per hit, in hit order.

use rag_store::RetrievalHit;
use tracing::debug;

use crate::corpus::DocumentStore;
use crate::error::FormatError;

const BLOCK_SEPARATOR: &str = "\n";

/// Window geometry: records within `radius * span_multiplier` of a hit are included.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    /// `k`
    pub radius: u64,
    /// `m`; the window deliberately spans twice the radius by default.
    pub span_multiplier: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            radius: 1,
            span_multiplier: 2,
        }
    }
}

impl WindowConfig {
    /// Half-width of the window, in sequence positions.
    pub fn half_width(&self) -> u64 {
        self.radius.saturating_mul(self.span_multiplier)
    }

    /// Inclusive `(lo, hi)` bounds around `index`.
    pub fn bounds(&self, index: u64) -> (u64, u64) {
        let w = self.half_width();
        (index.saturating_sub(w), index.saturating_add(w))
    }
}

/// Expands each hit into a block of neighbouring messages.
///
/// A window holding only the primary interlocutor's messages yields an empty
/// block; hits are never dropped.
///
/// # Errors
/// [`FormatError::EmptyStore`] if the store has no records.
pub fn expand_hits(
    hits: &[RetrievalHit],
    store: &DocumentStore,
    cfg: &WindowConfig,
    primary: &str,
) -> Result<Vec<String>, FormatError> {
    if store.is_empty() {
        return Err(FormatError::EmptyStore);
    }

    let blocks: Vec<String> = hits
        .iter()
        .map(|hit| {
            let (lo, hi) = cfg.bounds(hit.sequence_index);
            store
                .range(lo, hi)
                .iter()
                .filter(|r| r.speaker != primary)
                .map(|r| r.text.as_str())
                .collect::<Vec<_>>()
                .join(BLOCK_SEPARATOR)
        })
        .collect();

    debug!(
        hits = hits.len(),
        half_width = cfg.half_width(),
        empty_blocks = blocks.iter().filter(|b| b.is_empty()).count(),
        "expanded hits into context blocks"
    );
    Ok(blocks)
}

/// Splits a block back into its message texts.
///
/// Exact inverse of the join only for single-line texts.
pub fn split_block(block: &str) -> Vec<&str> {
    if block.is_empty() {
        Vec::new()
    } else {
        block.split(BLOCK_SEPARATOR).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MessageRecord;

    fn store(speakers: &[&str]) -> DocumentStore {
        let records = speakers
            .iter()
            .enumerate()
            .map(|(i, s)| MessageRecord {
                sequence_index: i as u64,
                speaker: (*s).to_string(),
                text: format!("t{i}"),
            })
            .collect();
        DocumentStore::from_records(records).unwrap()
    }

    fn hit(i: u64) -> RetrievalHit {
        RetrievalHit {
            sequence_index: i,
            score: 1.0,
            text: format!("t{i}"),
        }
    }

    #[test]
    fn narrow_window_skips_primary() {
        let s = store(&["A", "B", "A", "B", "A"]);
        let cfg = WindowConfig {
            radius: 1,
            span_multiplier: 1,
        };
        let blocks = expand_hits(&[hit(2)], &s, &cfg, "A").unwrap();
        assert_eq!(blocks, vec!["t1\nt3".to_string()]);
    }

    #[test]
    fn default_window_spans_two_radii() {
        let s = store(&["B", "B", "B", "B", "B", "B", "B"]);
        let blocks = expand_hits(&[hit(3)], &s, &WindowConfig::default(), "A").unwrap();
        assert_eq!(blocks, vec!["t1\nt2\nt3\nt4\nt5".to_string()]);
    }

    #[test]
    fn one_block_per_hit_in_hit_order() {
        let s = store(&["A", "B", "C", "B", "A", "C", "B", "A"]);
        let hits = [hit(6), hit(0), hit(6), hit(3)];
        let cfg = WindowConfig::default();
        let blocks = expand_hits(&hits, &s, &cfg, "A").unwrap();
        assert_eq!(blocks.len(), hits.len());

        for (h, block) in hits.iter().zip(&blocks) {
            let (lo, hi) = cfg.bounds(h.sequence_index);
            for text in split_block(block) {
                let rec = s.records().iter().find(|r| r.text == text).unwrap();
                assert!(rec.sequence_index >= lo && rec.sequence_index <= hi);
                assert_ne!(rec.speaker, "A");
            }
        }
        assert_eq!(blocks[0], blocks[2]);
        assert_eq!(blocks[1], "t1\nt2");
    }

    #[test]
    fn lower_bound_saturates_and_hits_past_the_end_are_kept() {
        let s = store(&["B", "B", "B"]);
        let blocks = expand_hits(&[hit(0), hit(40)], &s, &WindowConfig::default(), "A").unwrap();
        assert_eq!(blocks, vec!["t0\nt1\nt2".to_string(), String::new()]);
    }

    #[test]
    fn primary_only_window_yields_empty_block() {
        let s = store(&["A", "A", "A", "B", "B", "B"]);
        let cfg = WindowConfig {
            radius: 1,
            span_multiplier: 1,
        };
        let blocks = expand_hits(&[hit(1)], &s, &cfg, "A").unwrap();
        assert_eq!(blocks, vec![String::new()]);
    }

    #[test]
    fn empty_store_is_an_error() {
        let err = expand_hits(&[hit(1)], &DocumentStore::default(), &WindowConfig::default(), "A")
            .unwrap_err();
        assert!(matches!(err, FormatError::EmptyStore));
    }

    #[test]
    fn split_recovers_filtered_texts() {
        let s = store(&["A", "B", "C", "A", "B"]);
        let blocks = expand_hits(&[hit(2)], &s, &WindowConfig::default(), "A").unwrap();
        let expected: Vec<&str> = s
            .range(0, 4)
            .iter()
            .filter(|r| r.speaker != "A")
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(split_block(&blocks[0]), expected);
        assert!(split_block("").is_empty());
    }

    #[test]
    fn speaker_match_is_exact() {
        let s = store(&["Alice", "Alice Smith", "alice"]);
        let blocks = expand_hits(&[hit(1)], &s, &WindowConfig::default(), "Alice").unwrap();
        assert_eq!(blocks, vec!["t1\nt2".to_string()]);
    }
}
