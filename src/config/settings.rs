//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Remote chat platform endpoints
    pub platform: PlatformSettings,

    /// Gateway session behaviour
    pub gateway: GatewaySettings,

    /// Typing job limits and defaults
    pub typing: TypingSettings,

    /// Record retention
    pub registry: RegistrySettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// Remote platform endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformSettings {
    /// REST API base, without trailing slash
    pub api_base: String,

    /// Real-time gateway URL
    pub gateway_url: String,

    /// User-Agent sent with REST requests
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Gateway session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySettings {
    /// Upper bound for connect + hello + identify + ready + voice join
    pub handshake_timeout_secs: u64,

    /// How long a connect request waits for the handshake outcome
    pub connect_grace_secs: u64,

    /// How long a disconnect waits for the connection to be released
    pub disconnect_timeout_secs: u64,

    /// Declared client environment sent in identify
    pub client_os: String,
    pub client_browser: String,
    pub client_device: String,
}

/// Typing job configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TypingSettings {
    /// Delay between lines when the request does not give one
    pub default_delay_secs: u64,

    /// Largest accepted per-line delay
    pub max_delay_secs: u64,

    /// Largest accepted number of lines per job
    pub max_lines: usize,
}

/// Registry retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// How long finished jobs and sessions stay pollable
    pub retention_secs: u64,

    /// How often expired records are swept
    pub sweep_interval_secs: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (empty allows any)
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the values are inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Self::builder(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__SERVER__PORT=3000 -> server.port = 3000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", std::env::var("PORT").ok())?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    /// Defaults only, with no file or environment sources.
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder("test")?
            .build()?
            .try_deserialize()
            .and_then(Self::validate)
    }

    fn builder(
        environment: &str,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("platform.api_base", "https://discord.com/api/v9")?
            .set_default(
                "platform.gateway_url",
                "wss://gateway.discord.gg/?v=9&encoding=json",
            )?
            .set_default(
                "platform.user_agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )?
            .set_default("platform.request_timeout_secs", 15)?
            .set_default("gateway.handshake_timeout_secs", 30)?
            .set_default("gateway.connect_grace_secs", 10)?
            .set_default("gateway.disconnect_timeout_secs", 5)?
            .set_default("gateway.client_os", "windows")?
            .set_default("gateway.client_browser", "chrome")?
            .set_default("gateway.client_device", "pc")?
            .set_default("typing.default_delay_secs", 60)?
            .set_default("typing.max_delay_secs", 86_400_i64)?
            .set_default("typing.max_lines", 10_000_i64)?
            .set_default("registry.retention_secs", 3600)?
            .set_default("registry.sweep_interval_secs", 60)?
            .set_default("cors.allowed_origins", Vec::<String>::new())
    }

    fn validate(settings: Self) -> Result<Self, ConfigError> {
        if settings.registry.sweep_interval_secs == 0 {
            return Err(ConfigError::Message(
                "registry.sweep_interval_secs must be greater than zero".into(),
            ));
        }
        if settings.typing.max_delay_secs < settings.typing.default_delay_secs {
            return Err(ConfigError::Message(format!(
                "typing.max_delay_secs ({}) must not be below typing.default_delay_secs ({})",
                settings.typing.max_delay_secs, settings.typing.default_delay_secs
            )));
        }
        Ok(settings)
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PlatformSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl GatewaySettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn connect_grace(&self) -> Duration {
        Duration::from_secs(self.connect_grace_secs)
    }

    pub fn disconnect_timeout(&self) -> Duration {
        Duration::from_secs(self.disconnect_timeout_secs)
    }
}

impl RegistrySettings {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
