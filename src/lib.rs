//! Pageshot
//!
//! Renders a web page in a fresh headless browser and hands back a PNG of
//! its viewport. The crate is split into small layers:
//!
//! - **Engine** ([`Engine`], [`Backend`]): one browser session, synchronous,
//!   driven over the Chrome DevTools Protocol by [`cdp::CdpBackend`]
//! - **Session** ([`session::Session`]): async handle over an engine that lives
//!   on its own worker thread and is always released exactly once
//! - **Capture** ([`capture::Capturer`]): the request pipeline (validate,
//!   acquire, navigate, capture, release)
//! - **Server** ([`server::router`]): `GET /api/screenshot?url=...`
//!
//! # Example
//!
//! ```no_run
//! use pageshot::capture::{CaptureRequest, Capturer};
//! use pageshot::cdp::CdpBackend;
//! use pageshot::EngineConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let capturer = Capturer::new(CdpBackend, EngineConfig::default());
//! let request = CaptureRequest::from_query(Some("url=https://example.com"))?;
//! let shot = capturer.capture(&request).await?;
//! assert_eq!((shot.width, shot.height), (1280, 720));
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

pub mod error;
pub use error::{Error, Result};

#[cfg(feature = "cdp")]
pub mod cdp;

pub mod capture;
pub mod config;
pub mod idle;
pub mod png;
pub mod server;
pub mod session;

/// Configuration for one rendering session
///
/// The defaults reproduce the behaviour the front-end relies on: a 1280×720
/// viewport at scale factor 1, a 30 second navigation budget and the
/// "at most two requests in flight for 500ms" idle heuristic.
///
/// # Examples
///
/// ```
/// let cfg = pageshot::EngineConfig::default();
/// assert_eq!(cfg.viewport.pixel_size(), (1280, 720));
/// assert_eq!(cfg.timeout_ms, 30000);
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// User agent override; `None` keeps the browser's own
    pub user_agent: Option<String>,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// Navigation timeout in milliseconds (covers load and network idle)
    pub timeout_ms: u64,
    /// How long the network must stay quiet before the page counts as settled
    pub idle_ms: u64,
    /// Requests still in flight that are tolerated while idle
    pub idle_max_inflight: u32,
    /// Delay between two network samples
    pub poll_interval_ms: u64,
    /// Whether Chrome runs with its own sandbox
    pub sandbox: bool,
    /// Explicit Chrome/Chromium binary; `None` lets the backend discover one
    pub chrome_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: None,
            viewport: Viewport::default(),
            timeout_ms: 30000,
            idle_ms: 500,
            idle_max_inflight: 2,
            poll_interval_ms: 100,
            sandbox: false,
            chrome_path: None,
        }
    }
}

impl EngineConfig {
    /// Reject configurations no session could honour
    pub fn validate(&self) -> Result<()> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must not be empty".into()));
        }
        let dsf = self.viewport.device_scale_factor;
        if dsf.is_nan() || dsf <= 0.0 {
            return Err(Error::ConfigError(format!(
                "device scale factor must be positive, got {}",
                self.viewport.device_scale_factor
            )));
        }
        if self.timeout_ms == 0 {
            return Err(Error::ConfigError("navigation timeout must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::ConfigError("poll interval must be positive".into()));
        }
        Ok(())
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_scale_factor: 1.0,
        }
    }
}

impl Viewport {
    /// Size in device pixels of an image captured from this viewport
    pub fn pixel_size(&self) -> (u32, u32) {
        let scale = |v: u32| (f64::from(v) * self.device_scale_factor).round() as u32;
        (scale(self.width), scale(self.height))
    }
}

/// One rendering session: a browser plus the single page it drives
///
/// Implementations are synchronous; the [`session`] module moves them onto a
/// worker thread. Dropping an engine must also free its resources, `close`
/// is the explicit, reportable form of that.
pub trait Engine {
    /// Load a URL and wait until the page has settled
    fn load_url(&mut self, url: &str) -> Result<()>;

    /// Render the visible viewport as a PNG image
    fn render_png(&self) -> Result<Vec<u8>>;

    /// Close the engine and clean up resources
    fn close(self) -> Result<()>;
}

/// Factory for rendering sessions
///
/// Every call to `launch` must produce an independent engine; nothing is
/// shared or reused between two sessions.
pub trait Backend: Send + Sync + 'static {
    type Engine: Engine;

    /// Start a fresh session configured with `config`
    fn launch(&self, config: &EngineConfig) -> Result<Self::Engine>;
}
