//! OpenAI-compatible request/response types
//!
//! Hand-rolled serde structs matching the `OpenAI` Chat Completions API.
//! Both directions are derived so tests can stand up a mock provider.

use serde::{Deserialize, Serialize};
use steer::{ChatMessage, Error, Result};
use steer_runtime::CompletionRequest;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// `POST /chat/completions` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub stream: bool,
}

impl From<&CompletionRequest> for ChatCompletionRequest {
    fn from(request: &CompletionRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.messages.clone(),
            temperature: Some(request.temperature),
            top_p: Some(request.top_p),
            max_tokens: Some(request.max_tokens),
            stream: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// `POST /chat/completions` response (non-streaming).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: u64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Content of the first choice.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if there is no choice or its content
    /// is null.
    pub fn into_text(self) -> Result<String> {
        let choice = self
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::transport(None, "response has no choices"))?;
        choice
            .message
            .content
            .ok_or_else(|| Error::transport(None, "first choice has no content"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: usize,
    pub message: ResponseMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Assistant message of a choice. `content` is null when the provider
/// answered with a tool call instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// OpenAI-style error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_wire_format() {
        let request = CompletionRequest::new(vec![ChatMessage::user("Hi")]).with_temperature(0.25);
        let json = serde_json::to_value(ChatCompletionRequest::from(&request)).unwrap();
        assert_eq!(
            json,
            json!({
                "model": "deepseek-ai/DeepSeek-R1-Distill-Llama-70B",
                "messages": [{"role": "user", "content": "Hi"}],
                "temperature": 0.25,
                "top_p": 1.0,
                "max_tokens": 500,
                "stream": false
            })
        );
    }

    #[test]
    fn minimal_response_parses() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "get_weather"}}]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "get_weather");
    }

    #[test]
    fn null_content_is_a_transport_error() {
        let response: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": null}}]
        }))
        .unwrap();
        assert!(matches!(
            response.into_text(),
            Err(Error::Transport { status: None, .. })
        ));
    }
}
