//! HTTP generation provider
//!
//! Talks to a chat-completions style endpoint: one user message per prompt,
//! first choice's message content is the generated text. Any transport or
//! decoding failure is a [`GenerationError`]; the operation set falls back to
//! the heuristic, so nothing here is fatal.

use crate::config::{ConfigError, GenerationConfig, ProviderKind};
use async_trait::async_trait;
use dn_core::{AbsentProvider, GenerationError, GenerationParams, GenerationProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Provider backed by an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: reqwest::Client,
    endpoint: String,
    model: Option<String>,
    name: String,
    api_key: Option<String>,
}

impl HttpProvider {
    /// Create new provider for an endpoint
    ///
    /// # Errors
    /// - `Invalid` if the HTTP client cannot be built
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::Invalid(format!("http client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: None,
            name: "http".to_string(),
            api_key: None,
        })
    }

    /// With default model
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// With reported name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// With bearer key
    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Build from `[generation]`
    ///
    /// # Errors
    /// - `Invalid` if the endpoint is missing or the client cannot be built
    pub fn from_config(config: &GenerationConfig) -> Result<Self, ConfigError> {
        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ConfigError::Invalid("generation.endpoint is required".to_string()))?;
        let mut provider = Self::new(endpoint, Duration::from_secs(config.timeout_secs))?;
        if let Some(model) = &config.model {
            provider = provider.with_name(model.clone()).with_model(model.clone());
        }
        if let Some(name) = &config.name {
            provider = provider.with_name(name.clone());
        }
        if let Some(var) = &config.api_key_env {
            match std::env::var(var) {
                Ok(key) if !key.is_empty() => provider = provider.with_api_key(key),
                _ => tracing::warn!(env = %var, "generation api key variable is unset"),
            }
        }
        Ok(provider)
    }
}

#[async_trait]
impl GenerationProvider for HttpProvider {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        // First preferred model wins over the configured default.
        let model = params
            .model_preference
            .as_ref()
            .and_then(|models| models.first())
            .or(self.model.as_ref())
            .map(String::as_str);
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| GenerationError::Failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Failed(format!("endpoint answered {status}")));
        }
        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unusable(e.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Unusable("empty completion".to_string()))
    }
}

/// Provider selected by `[generation]`
///
/// # Errors
/// - `Invalid` for an unusable `http` configuration
pub fn from_config(config: &GenerationConfig) -> Result<Arc<dyn GenerationProvider>, ConfigError> {
    match config.kind {
        ProviderKind::Absent => Ok(Arc::new(AbsentProvider)),
        ProviderKind::Http => Ok(Arc::new(HttpProvider::from_config(config)?)),
    }
}
