//! `reqwest`-backed client for the `/generate` endpoint.

use axum::body::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

use crate::config::GenerationConfig;

use super::{GenerateRequest, GenerateResponse, GenerationError, GenerationService};

/// HTTP client for the generation service.
///
/// No request timeout is configured; a call lasts as long as the service
/// takes to answer.
#[derive(Clone)]
pub struct HttpGenerationClient {
    http: reqwest::Client,
    endpoint: url::Url,
    config: GenerationConfig,
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("config", &self.config)
            .finish()
    }
}

impl HttpGenerationClient {
    /// Create a client for the endpoint derived from `config`.
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        let endpoint = config.endpoint()?;
        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            config,
        })
    }

    /// Absolute URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Pass a raw `/generate` call through to the service unchanged.
    ///
    /// Used by the dev proxy route. The caller's `Authorization` header wins
    /// over the configured key so browser clients keep their own credentials.
    pub async fn forward(
        &self,
        authorization: Option<String>,
        body: Bytes,
    ) -> Result<(reqwest::StatusCode, Bytes), GenerationError> {
        let auth = authorization.unwrap_or_else(|| format!("Bearer {}", self.config.api_key));
        let resp = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, auth)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        Ok((status, bytes))
    }
}

#[async_trait::async_trait]
impl GenerationService for HttpGenerationClient {
    async fn generate(&self, user_prompt: &str) -> Result<GenerateResponse, GenerationError> {
        let body = GenerateRequest {
            user_prompt: user_prompt.to_string(),
        };

        tracing::debug!(
            endpoint = %self.endpoint,
            prompt_length = user_prompt.len(),
            "Sending generation request"
        );

        let resp = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Generation service returned error status");
            return Err(GenerationError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(GenerateResponse::from_json(&value))
    }
}
