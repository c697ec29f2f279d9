//! Retry full completions until one satisfies a constraint.

use steer::{Constraint, Error, Result};

use crate::completion::{CompletionRequest, TextCompletion};

/// Temperature added per rejected attempt.
const TEMPERATURE_STEP: f32 = 0.1;

/// Attempt budget and temperature schedule of [`generate_with_constraint`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    /// Temperature of the first attempt.
    pub initial_temperature: f32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_temperature: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Temperature of zero-based attempt `attempt`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn temperature(&self, attempt: usize) -> f32 {
        self.initial_temperature + TEMPERATURE_STEP * attempt as f32
    }
}

/// Request completions until one is valid and complete under `constraint`.
///
/// Each attempt reuses `request` with its temperature replaced by the
/// policy's schedule. The accepted text is returned exactly as produced.
///
/// # Errors
/// Returns [`Error::ConstraintExhausted`] when no attempt is accepted.
/// Errors from the completion backend abort the loop immediately and are
/// never retried.
pub async fn generate_with_constraint<C, K>(
    completion: &mut C,
    request: &CompletionRequest,
    constraint: &K,
    policy: &RetryPolicy,
) -> Result<String>
where
    C: TextCompletion,
    K: Constraint + ?Sized,
{
    let mut request = request.clone();
    let mut last_text = None;
    for attempt in 0..policy.max_attempts {
        request.temperature = policy.temperature(attempt);
        let text = completion.complete(&request).await?;
        let verdict = constraint.check(&text);
        if verdict.is_accepted() {
            tracing::debug!(attempt, temperature = request.temperature, "completion accepted");
            return Ok(text);
        }
        tracing::warn!(
            attempt,
            temperature = request.temperature,
            valid = verdict.valid,
            complete = verdict.complete,
            text = %text,
            "completion rejected by constraint"
        );
        last_text = Some(text);
    }
    Err(Error::ConstraintExhausted {
        attempts: policy.max_attempts,
        last_text,
    })
}
