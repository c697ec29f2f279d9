//! The full-text completion contract.

use std::future::Future;

use serde::{Deserialize, Serialize};
use steer::{ChatMessage, Result};

/// Model requested when the caller does not name one.
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-R1-Distill-Llama-70B";

/// One full completion request: messages plus sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier. Local backends serve a single model and ignore it.
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            messages: Vec::new(),
            temperature: 0.5,
            top_p: 1.0,
            max_tokens: 500,
        }
    }
}

impl CompletionRequest {
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// A backend that turns a message list into one full response text.
///
/// Implemented by the local step-driven runtime and by hosted providers.
pub trait TextCompletion {
    /// Produce one completion for `request`.
    ///
    /// # Errors
    /// Returns [`steer::Error::Transport`] when a remote backend cannot be
    /// reached or answers with an error, or the local runtime's error.
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String>> + Send;
}
