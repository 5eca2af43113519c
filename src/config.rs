//! Service configuration, read from flags or the environment

use crate::{EngineConfig, Error, Result, Viewport};
use axum::http::HeaderValue;
use clap::Args;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Options of the screenshot service
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Front-end origin written to Access-Control-Allow-Origin
    #[arg(long, env = "ALLOWED_ORIGIN", default_value = DEFAULT_ALLOWED_ORIGIN)]
    pub allowed_origin: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

/// Rendering options shared by `serve` and `capture`
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Navigation timeout in milliseconds
    #[arg(long, env = "NAV_TIMEOUT_MS", default_value_t = 30000)]
    pub nav_timeout_ms: u64,

    /// Quiet period before a page counts as loaded, in milliseconds
    #[arg(long, env = "IDLE_MS", default_value_t = 500)]
    pub idle_ms: u64,

    /// Viewport width in CSS pixels
    #[arg(long, env = "VIEWPORT_WIDTH", default_value_t = 1280)]
    pub width: u32,

    /// Viewport height in CSS pixels
    #[arg(long, env = "VIEWPORT_HEIGHT", default_value_t = 720)]
    pub height: u32,

    /// Chrome/Chromium binary to launch
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    /// Keep Chrome's sandbox enabled
    #[arg(long, env = "CHROME_SANDBOX", default_value_t = false)]
    pub chrome_sandbox: bool,

    /// User agent override
    #[arg(long, env = "USER_AGENT")]
    pub user_agent: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::from([0, 0, 0, 0]),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            engine: EngineArgs::default(),
        }
    }
}

impl Default for EngineArgs {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            nav_timeout_ms: engine.timeout_ms,
            idle_ms: engine.idle_ms,
            width: engine.viewport.width,
            height: engine.viewport.height,
            chrome_path: None,
            chrome_sandbox: engine.sandbox,
            user_agent: None,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// The origin as a header value; rejected when it cannot be sent over HTTP
    pub fn origin_header(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.allowed_origin)
            .map_err(|e| Error::ConfigError(format!("invalid ALLOWED_ORIGIN '{}': {}", self.allowed_origin, e)))
    }

    pub fn engine_config(&self) -> Result<EngineConfig> {
        self.engine.engine_config()
    }
}

impl EngineArgs {
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let config = EngineConfig {
            user_agent: self.user_agent.clone(),
            viewport: Viewport {
                width: self.width,
                height: self.height,
                ..Default::default()
            },
            timeout_ms: self.nav_timeout_ms,
            idle_ms: self.idle_ms,
            sandbox: self.chrome_sandbox,
            chrome_path: self.chrome_path.clone(),
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}
