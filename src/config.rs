//! Layered application configuration.
//!
//! Sources, lowest priority first: built-in defaults, an optional YAML file,
//! `GLOW_`-prefixed environment variables, then CLI flags (which also pick up
//! the legacy `VITE_API_BASE` / `VITE_API_KEY` names through `clap`'s env
//! support).

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

/// Default origin of the text-generation service.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE")]
    pub config: Option<String>,

    /// Address to bind
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Base URL of the generation service
    #[arg(long, env = "VITE_API_BASE")]
    pub api_base: Option<String>,

    /// Bearer token sent to the generation service
    #[arg(long, env = "VITE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub generation: GenerationConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Connection settings for the generation service.
///
/// Handed to the HTTP client at construction; nothing below the server layer
/// reads the environment.
#[derive(Deserialize, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Origin the `/generate` path is resolved against.
    pub base_url: String,
    /// Sent verbatim as `Authorization: Bearer <api_key>`.
    pub api_key: String,
}

impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl GenerationConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Absolute URL of the `/generate` endpoint.
    pub fn endpoint(&self) -> Result<url::Url, url::ParseError> {
        url::Url::parse(&format!(
            "{}/generate",
            self.base_url.trim().trim_end_matches('/')
        ))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Widgets idle for longer than this are dropped from the store.
    pub idle_timeout_secs: u64,
}

impl SessionConfig {
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, config::ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli =
            Cli::try_parse_from(args).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        let mut builder = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5173)?
            .set_default("generation.base_url", DEFAULT_BASE_URL)?
            .set_default("generation.api_key", "")?
            .set_default("session.idle_timeout_secs", 30 * 60)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path).required(true)),
            None => builder.add_source(File::with_name("glow").required(false)),
        };

        // E.g. GLOW_SERVER__PORT=8080, GLOW_GENERATION__API_KEY=...
        builder = builder.add_source(
            Environment::with_prefix("GLOW")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(host) = cli.host {
            builder = builder.set_override("server.host", host)?;
        }
        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(base) = cli.api_base.filter(|s| !s.trim().is_empty()) {
            builder = builder.set_override("generation.base_url", base)?;
        }
        if let Some(key) = cli.api_key {
            builder = builder.set_override("generation.api_key", key)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        self.generation.endpoint().map_err(|e| {
            config::ConfigError::Message(format!(
                "generation.base_url {:?} is not a valid URL: {e}",
                self.generation.base_url
            ))
        })?;
        Ok(())
    }
}
