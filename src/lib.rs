//! GlowAdvisor
//!
//! A single-page skincare chat assistant. The page collects a question,
//! forwards it to an external text-generation service, and renders the
//! markdown reply as a chat bubble.
//!
//! # Architecture
//!
//! - **Server**: Axum router serving the page and HTMX fragments
//! - **Widget**: Conversation state with a single-flight request gate
//! - **Generation**: `POST /generate` client behind a trait
//! - **UI**: Server-rendered HTML + HTMX + Alpine.js
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, file, env, CLI)
//! - [`generation`]: Generation service contract and HTTP client
//! - [`markdown`]: Markdown rendering and HTML escaping
//! - [`widget`]: Chat widget, messages and widget store
//! - [`server`]: Router, handlers and startup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unused_async)]

pub mod config;
pub mod generation;
pub mod markdown;
pub mod server;
pub mod ui;
pub mod widget;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::generation::{GenerationError, GenerationService, HttpGenerationClient};
use crate::markdown::{CmarkRenderer, MarkdownRenderer};
use crate::widget::WidgetStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live chat widgets, one per page load.
    pub widgets: WidgetStore,
    /// Renders assistant markdown.
    pub renderer: Arc<dyn MarkdownRenderer>,
    /// Raw client used by the `/generate` pass-through.
    pub proxy: Arc<HttpGenerationClient>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("widgets", &self.widgets.len())
            .field("proxy", &self.proxy)
            .finish()
    }
}

impl AppState {
    /// Build state whose widgets call the configured generation service.
    pub fn new(config: &AppConfig) -> Result<Self, GenerationError> {
        let client = Arc::new(HttpGenerationClient::new(config.generation.clone())?);
        let service: Arc<dyn GenerationService> = Arc::clone(&client) as _;
        Ok(Self::assemble(service, client))
    }

    /// Build state whose widgets call `service` instead of the HTTP client.
    pub fn with_service(
        config: &AppConfig,
        service: Arc<dyn GenerationService>,
    ) -> Result<Self, GenerationError> {
        let client = Arc::new(HttpGenerationClient::new(config.generation.clone())?);
        Ok(Self::assemble(service, client))
    }

    fn assemble(service: Arc<dyn GenerationService>, proxy: Arc<HttpGenerationClient>) -> Self {
        Self {
            widgets: WidgetStore::new(service),
            renderer: Arc::new(CmarkRenderer),
            proxy,
        }
    }
}
