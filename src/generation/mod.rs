//! Contract with the external text-generation service.
//!
//! The service exposes a single endpoint, `POST /generate`, which accepts
//! `{"user_prompt": "..."}` and answers with `{"response": "<markdown>"}`.
//!
//! # Overview
//!
//! The [`GenerationService`] trait is the seam the chat widget talks through.
//! [`HttpGenerationClient`] is the production implementation; tests inject
//! their own.
//!
//! # Example
//!
//! ```rust,ignore
//! use glow_advisor::config::GenerationConfig;
//! use glow_advisor::generation::{GenerationService, HttpGenerationClient};
//!
//! let client = HttpGenerationClient::new(GenerationConfig::new("http://127.0.0.1:8000", "key"))?;
//! let reply = client.generate("Help with acne treatment").await?;
//! ```

pub mod http;

pub use http::HttpGenerationClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request body for `POST /generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// The user's trimmed prompt.
    pub user_prompt: String,
}

/// Successful reply from the generation service.
///
/// `response` is `None` when the body had no string `response` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Markdown produced by the model.
    pub response: Option<String>,
}

impl GenerateResponse {
    /// Extract the reply from an arbitrary JSON body.
    ///
    /// Anything other than an object with a string `response` yields `None`.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            response: value
                .get("response")
                .and_then(serde_json::Value::as_str)
                .map(ToString::to_string),
        }
    }

    /// The reply text, if present and non-empty.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().filter(|s| !s.is_empty())
    }
}

/// Failure talking to the generation service.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// Connection, TLS or body transfer failure.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The body was not valid JSON.
    #[error("invalid JSON in response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL could not be turned into an endpoint.
    #[error("invalid generation endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Anything that can turn a prompt into a markdown reply.
#[async_trait::async_trait]
pub trait GenerationService: Send + Sync + std::fmt::Debug {
    /// Issue exactly one generation request for `user_prompt`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, or a body
    /// that is not JSON.
    async fn generate(&self, user_prompt: &str) -> Result<GenerateResponse, GenerationError>;
}
