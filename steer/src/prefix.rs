//! Prefix reuse between consecutive evaluations.
//!
//! When a runtime is asked to reach a token sequence that shares a leading
//! portion with what it last evaluated, only the differing tail needs a
//! forward pass. [`plan`] decides what to keep; [`evaluate`] applies the
//! decision to a [`Model`].

use crate::model::Model;
use crate::{Error, Result};

/// How to bring a runtime from its history to a new token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixPlan {
    /// History is exactly `new_tokens[..from]`; evaluate `new_tokens[from..]`.
    Extend { from: usize },
    /// History diverges after `keep` tokens; roll back to `keep`, then
    /// evaluate `new_tokens[keep..]`.
    Rewind { keep: usize },
    /// Nothing reusable: clear the runtime and evaluate everything.
    Reset,
}

impl PrefixPlan {
    /// Index of the first token that will be evaluated.
    #[must_use]
    pub fn start(self) -> usize {
        match self {
            Self::Extend { from } => from,
            Self::Rewind { keep } => keep,
            Self::Reset => 0,
        }
    }
}

/// Length of the longest common prefix of two token sequences.
#[must_use]
pub fn common_prefix_len(a: &[u32], b: &[u32]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Decide how much of `history` can be kept to reach `new_tokens`.
///
/// The last token of `new_tokens` is always evaluated, because its logits
/// are the ones the caller wants; the common prefix is therefore measured
/// against `new_tokens[..len - 1]`.
#[must_use]
pub fn plan(history: &[u32], new_tokens: &[u32], force_reset: bool) -> PrefixPlan {
    if force_reset {
        return PrefixPlan::Reset;
    }
    if history.is_empty() {
        return PrefixPlan::Extend { from: 0 };
    }
    let target = &new_tokens[..new_tokens.len().saturating_sub(1)];
    let keep = common_prefix_len(history, target);
    if keep == 0 {
        PrefixPlan::Reset
    } else if keep == history.len() {
        PrefixPlan::Extend { from: keep }
    } else {
        PrefixPlan::Rewind { keep }
    }
}

/// Bring `model` to the state of having evaluated exactly `new_tokens`.
///
/// Each token is evaluated at most once, in a single [`Model::eval`]
/// call. A rewind the runtime cannot perform degrades to a full reset.
///
/// # Errors
/// Returns [`Error::InvalidPrompt`] if `new_tokens` is empty, or the
/// runtime's evaluation error.
pub fn evaluate<M: Model + ?Sized>(
    model: &mut M,
    new_tokens: &[u32],
    force_reset: bool,
) -> Result<PrefixPlan> {
    if new_tokens.is_empty() {
        return Err(Error::InvalidPrompt("nothing to evaluate".into()));
    }
    let mut plan = plan(model.history(), new_tokens, force_reset);
    match plan {
        PrefixPlan::Extend { from } if from > 0 => {
            tracing::debug!(reused = from, "prefix-match hit");
        }
        PrefixPlan::Extend { .. } => {}
        PrefixPlan::Rewind { keep } => {
            if model.rewind(keep) {
                tracing::debug!(reused = keep, "prefix-match hit, rolled back");
            } else {
                tracing::debug!(keep, "runtime cannot roll back, resetting");
                model.reset();
                plan = PrefixPlan::Reset;
            }
        }
        PrefixPlan::Reset => {
            tracing::debug!("no reusable prefix, resetting");
            model.reset();
        }
    }
    model.eval(&new_tokens[plan.start()..])?;
    Ok(plan)
}
