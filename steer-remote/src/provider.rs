//! Supported hosted providers.

use std::fmt;
use std::str::FromStr;

use steer::{Error, Result};

/// A hosted provider of the `OpenAI` Chat Completions API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    #[default]
    DeepInfra,
    OpenAi,
    Hyperbolic,
}

impl Provider {
    pub const ALL: [Self; 3] = [Self::DeepInfra, Self::OpenAi, Self::Hyperbolic];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeepInfra => "deepinfra",
            Self::OpenAi => "openai",
            Self::Hyperbolic => "hyperbolic",
        }
    }

    /// Base URL; requests go to `{base_url}/chat/completions`.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::DeepInfra => "https://api.deepinfra.com/v1/openai",
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Hyperbolic => "https://api.hyperbolic.xyz/v1",
        }
    }

    /// Environment variable holding the API key.
    #[must_use]
    pub fn api_key_var(self) -> &'static str {
        match self {
            Self::DeepInfra => "DEEPINFRA_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Hyperbolic => "HYPERBOLIC_API_KEY",
        }
    }

    /// Read the API key from the environment.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] if the variable is unset or empty.
    pub fn api_key(self) -> Result<String> {
        let var = self.api_key_var();
        non_empty_key(var, std::env::var(var).ok())
    }
}

fn non_empty_key(var: &str, value: Option<String>) -> Result<String> {
    value
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| Error::MissingApiKey(var.to_string()))
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownProvider(s.to_string()))
    }
}
