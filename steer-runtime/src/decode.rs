//! Token-by-token constrained decoding.
//!
//! At every step the candidate stream of a [`Generation`] is walked best
//! first and the first token whose preview passes
//! [`Constraint::check_prefix`] is committed: `valid` means "can still lead
//! to an acceptable text", `complete` means "acceptable as it is".

use steer::{Constraint, Error, Generation, Model, Result};

/// Limits of [`constrained_decode`].
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Maximum number of tokens to commit.
    pub max_new_tokens: usize,
    /// Candidates inspected per step before giving up.
    pub max_candidates: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 500,
            max_candidates: 100,
        }
    }
}

/// Extend `generation` under `constraint` and return the generated text.
///
/// Stops after committing a token whose text the constraint reports
/// complete, when EOS is the best valid candidate, or at the token budget.
///
/// # Errors
/// Returns [`Error::NoValidCandidate`] when no inspected candidate of a step
/// is valid, or the session's evaluation error.
pub fn constrained_decode<M, K>(
    generation: &mut Generation<'_, M>,
    constraint: &K,
    options: &DecodeOptions,
) -> Result<String>
where
    M: Model + ?Sized,
    K: Constraint + ?Sized,
{
    let eos = generation.eos_token_id();
    for _ in 0..options.max_new_tokens {
        let (token, complete) = next_valid(generation, constraint, options.max_candidates)?;
        if token == eos {
            tracing::debug!("constrained decoding reached EOS");
            break;
        }
        generation.register(token)?;
        if complete {
            break;
        }
    }
    generation.text()
}

fn next_valid<M, K>(
    generation: &Generation<'_, M>,
    constraint: &K,
    max_candidates: usize,
) -> Result<(u32, bool)>
where
    M: Model + ?Sized,
    K: Constraint + ?Sized,
{
    let mut inspected = 0;
    for token in generation.candidates()?.take(max_candidates) {
        inspected += 1;
        let Ok(text) = generation.preview(token) else {
            continue;
        };
        let verdict = constraint.check_prefix(&text);
        if verdict.valid {
            tracing::trace!(token, inspected, text = %text, "candidate accepted");
            return Ok((token, verdict.complete));
        }
    }
    Err(Error::NoValidCandidate { inspected })
}
