//! Async HTTP client for OpenAI-compatible chat completion endpoints.

use std::future::Future;
use std::time::Duration;

use steer::{Error, Result};
use steer_runtime::{CompletionRequest, TextCompletion};

use crate::provider::Provider;
use crate::types::{ChatCompletionRequest, ChatCompletionResponse, ErrorResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for one hosted provider.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    provider: Provider,
    endpoint: String,
    api_key: String,
    http: reqwest::Client,
}

impl RemoteClient {
    /// Create a client for `provider` authenticating with `api_key`.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] if the HTTP client cannot be built.
    pub fn new(provider: Provider, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(None, e.to_string()))?;
        Ok(Self {
            provider,
            endpoint: endpoint(provider.base_url()),
            api_key: api_key.into(),
            http,
        })
    }

    /// Create a client with the API key read from the provider's
    /// environment variable.
    ///
    /// # Errors
    /// Returns [`Error::MissingApiKey`] if the variable is not set.
    pub fn from_env(provider: Provider) -> Result<Self> {
        Self::new(provider, provider.api_key()?)
    }

    /// Send requests to `base_url` instead of the provider's public URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = endpoint(base_url);
        self
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one chat completion request.
    ///
    /// # Errors
    /// Returns [`Error::Transport`] on network failure, a non-success
    /// status, or a body that is not a chat completion response.
    pub async fn chat(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        tracing::info!(provider = %self.provider, model = %request.model, "Using model");
        tracing::debug!(?request, "Sending chat completion request");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| Error::transport(e.status().map(|s| s.as_u16()), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(provider = %self.provider, status = status.as_u16(), "API error");
            tracing::error!(body = %body, "Response content");
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::transport(Some(status.as_u16()), message));
        }

        response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| Error::transport(Some(status.as_u16()), format!("malformed body: {e}")))
    }
}

impl TextCompletion for RemoteClient {
    fn complete(
        &mut self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String>> + Send {
        let body = ChatCompletionRequest::from(request);
        async move { self.chat(&body).await?.into_text() }
    }
}

fn endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        let client = RemoteClient::new(Provider::DeepInfra, "key").unwrap();
        assert_eq!(
            client.endpoint(),
            "https://api.deepinfra.com/v1/openai/chat/completions"
        );
        let client = client.with_base_url("http://127.0.0.1:8080/v1/");
        assert_eq!(client.endpoint(), "http://127.0.0.1:8080/v1/chat/completions");
        assert_eq!(client.provider(), Provider::DeepInfra);
    }
}
