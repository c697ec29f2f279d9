//! Candidate ranking over a logit vector.
//!
//! [`rank`] turns one evaluation step's logits into a lazy stream of token
//! IDs, best first. The stream is built as a heap, so a consumer that stops
//! after a handful of candidates never pays for a full sort of the
//! vocabulary.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A token ID with its score, ordered so the heap pops the best first.
#[derive(Debug, Clone, Copy)]
struct Scored {
    score: f32,
    id: u32,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher score wins; on a tie the lower id wins.
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Lazy, single-pass stream of token IDs in descending score order.
///
/// Ties are broken by ascending token ID. NaN scores rank below every
/// finite score.
#[derive(Debug, Clone)]
pub struct RankedTokens {
    heap: BinaryHeap<Scored>,
}

impl Iterator for RankedTokens {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.heap.pop().map(|s| s.id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.heap.len(), Some(self.heap.len()))
    }
}

impl ExactSizeIterator for RankedTokens {}

/// Rank the token IDs of a logit vector, best first.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn rank(logits: &[f32]) -> RankedTokens {
    let heap = logits
        .iter()
        .enumerate()
        .map(|(i, &score)| Scored {
            score: if score.is_nan() {
                f32::NEG_INFINITY
            } else {
                score
            },
            id: i as u32,
        })
        .collect();
    RankedTokens { heap }
}

/// Greedy: the token ID with the highest logit, lowest ID on ties.
#[must_use]
pub fn argmax(logits: &[f32]) -> Option<u32> {
    rank(logits).next()
}
