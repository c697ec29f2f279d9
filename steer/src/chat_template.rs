//! Chat messages and templates for converting them to model prompts
//!
//! [`ChatMessage`] follows the `OpenAI` messages format, including the
//! legacy `function_call` payload. The [`ChatTemplate`] trait converts a
//! sequence of messages into a prompt string suitable for a local model;
//! model-family crates provide concrete implementations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Function => "function",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A function invocation emitted by the assistant.
///
/// `arguments` is the raw JSON text as generated, not a parsed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

/// What a message carries: exactly one of text or a function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageBody {
    Content(String),
    FunctionCall(FunctionCall),
}

/// A chat message in the `OpenAI` messages format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Name of the function that produced a `function` message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl ChatMessage {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            name: None,
            body: MessageBody::Content(content.into()),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// An assistant turn that invokes a function.
    #[must_use]
    pub fn function_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            name: None,
            body: MessageBody::FunctionCall(FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            }),
        }
    }

    /// The result of running function `name`, fed back to the model.
    #[must_use]
    pub fn function_result(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Function,
            name: Some(name.into()),
            body: MessageBody::Content(content.into()),
        }
    }

    /// Text content, if this message carries text.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Content(text) => Some(text),
            MessageBody::FunctionCall(_) => None,
        }
    }
}

/// Converts `OpenAI`-style messages into a prompt string for the model.
///
/// Each model family has its own prompt format with special tokens.
/// Implement this trait for each supported format.
pub trait ChatTemplate: Send + Sync {
    /// Apply the template to a list of messages, producing a prompt string.
    fn apply(&self, messages: &[ChatMessage]) -> String;

    /// Whether the rendered prompt already contains the BOS marker, in
    /// which case the tokenizer must not add another.
    fn includes_bos(&self) -> bool {
        false
    }
}

impl ChatTemplate for Box<dyn ChatTemplate> {
    fn apply(&self, messages: &[ChatMessage]) -> String {
        (**self).apply(messages)
    }

    fn includes_bos(&self) -> bool {
        (**self).includes_bos()
    }
}

/// A raw template that concatenates message contents without special tokens.
///
/// Useful for base (non-instruct) models and testing. Function-call turns
/// render as `name(arguments)`.
pub struct RawTemplate;

impl ChatTemplate for RawTemplate {
    fn apply(&self, messages: &[ChatMessage]) -> String {
        messages
            .iter()
            .map(|m| match &m.body {
                MessageBody::Content(text) => text.clone(),
                MessageBody::FunctionCall(call) => format!("{}({})", call.name, call.arguments),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
