//! Hosted completion providers for steer
//!
//! [`RemoteClient`] speaks the `OpenAI` Chat Completions protocol to one of
//! the supported [`Provider`]s and implements
//! [`steer_runtime::TextCompletion`], so the retry protocol and the
//! function-calling pipeline run unchanged against a hosted model.

mod client;
mod provider;
pub mod types;

pub use client::RemoteClient;
pub use provider::Provider;
