//! Generation provider capability
//!
//! The provider is selected once at startup and injected into
//! [`crate::Operations`]. When no backend is configured the
//! [`AbsentProvider`] fails fast and every operation uses the heuristic.

use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling parameters passed with every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Sampling temperature in `[0, 1]`
    pub temperature: f32,
    /// Preferred models, in order
    pub model_preference: Option<Vec<String>>,
}

impl GenerationParams {
    /// Create params with a temperature
    #[inline]
    #[must_use]
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            model_preference: None,
        }
    }

    /// With model preference
    #[inline]
    #[must_use]
    pub fn with_model_preference(mut self, models: Option<Vec<String>>) -> Self {
        self.model_preference = models.filter(|m| !m.is_empty());
        self
    }
}

/// Text generation backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Identifier reported to callers as `provider`
    fn name(&self) -> String;

    /// Generate text for a prompt
    async fn generate_text(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, GenerationError>;
}

/// Provider used when no backend is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsentProvider;

#[async_trait]
impl GenerationProvider for AbsentProvider {
    fn name(&self) -> String {
        "absent".to_string()
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        _params: &GenerationParams,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Unavailable)
    }
}

/// Strip a surrounding Markdown code fence (with optional info string)
#[must_use]
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    match body.find('\n') {
        Some(newline) => body[newline + 1..].trim(),
        None => body.trim(),
    }
}
