//! Prompt encoders: from a request to a generation prefix.
//!
//! A prefix mixes raw token IDs (special tokens a tokenizer would never
//! emit from text) with text runs tokenized in place. Order is preserved
//! exactly, since text runs must join losslessly with their neighbours.

use crate::chat_template::ChatMessage;
use crate::function::FunctionSchema;
use crate::model::Model;
use crate::Result;

/// One element of a generation prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixItem {
    Token(u32),
    Text(String),
}

impl From<u32> for PrefixItem {
    fn from(id: u32) -> Self {
        Self::Token(id)
    }
}

impl From<String> for PrefixItem {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for PrefixItem {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// What the caller asked: a single question or a whole conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Text(String),
    Chat(Vec<ChatMessage>),
}

impl From<&str> for Prompt {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Prompt {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ChatMessage>> for Prompt {
    fn from(chat: Vec<ChatMessage>) -> Self {
        Self::Chat(chat)
    }
}

/// Builds generation prefixes for a model family.
pub trait Prompter {
    /// Encode a request as a prefix.
    ///
    /// Without `function_to_call` the prefix asks the model to pick a
    /// function; with it, the prefix asks for that function's arguments.
    ///
    /// # Errors
    /// Returns an error if the prompt shape is unsupported or
    /// `function_to_call` is not among `functions`.
    fn prompt(
        &self,
        prompt: &Prompt,
        functions: &[FunctionSchema],
        function_to_call: Option<&str>,
    ) -> Result<Vec<PrefixItem>>;
}

/// Flatten a prefix into token IDs, tokenizing text runs without BOS.
///
/// # Errors
/// Returns an error if tokenization fails.
pub fn tokenize_prefix<M: Model + ?Sized>(model: &M, prefix: &[PrefixItem]) -> Result<Vec<u32>> {
    let mut tokens = Vec::new();
    for item in prefix {
        match item {
            PrefixItem::Token(id) => tokens.push(*id),
            PrefixItem::Text(text) => tokens.extend(model.tokenize(text, false)?),
        }
    }
    Ok(tokens)
}
