//! Llama-family prompt encoders and chat templates for steer

mod chat_templates;
mod prompters;

pub use chat_templates::Llama2Template;
pub use prompters::{
    CodeLlamaFunctionCallingPrompter, LlamaInstructPrompter, ShouldCallResponse, BOS_ID, EOS_ID,
};
