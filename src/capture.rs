//! The capture pipeline behind `GET /api/screenshot`
//!
//! A request walks `Received → Validating → SessionAcquired → Navigating →
//! Capturing → SessionReleased`. Validation failures never reach a browser;
//! every acquired session is released before (or, after a navigation
//! timeout, concurrently with) the caller seeing the outcome.

use crate::png::PngInfo;
use crate::session::Session;
use crate::{Backend, EngineConfig, Error};
use log::{error, warn};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Public body of a 400 response
pub const BAD_REQUEST_MESSAGE: &str = "Missing ?url=";
/// Public body of a 500 response
pub const CAPTURE_FAILURE_MESSAGE: &str = "Failed to capture screenshot";
/// Content type of a successful capture
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Extra time the async side waits beyond the navigation timeout before
/// abandoning a launch or a session to its worker.
const NAVIGATION_GRACE: Duration = Duration::from_secs(1);

const NAVIGABLE_SCHEMES: &[&str] = &["http", "https", "file", "data", "about"];

/// Failures surfaced to whoever asked for a capture
#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    /// `url` missing, empty or given more than once
    #[error("Missing ?url=")]
    BadRequest,

    /// Anything that went wrong from URL parsing to PNG validation
    #[error("Failed to capture screenshot: {0}")]
    CaptureFailure(#[source] Error),
}

impl CaptureError {
    /// The static text a remote caller is allowed to see
    pub fn public_message(&self) -> &'static str {
        match self {
            CaptureError::BadRequest => BAD_REQUEST_MESSAGE,
            CaptureError::CaptureFailure(_) => CAPTURE_FAILURE_MESSAGE,
        }
    }
}

impl From<Error> for CaptureError {
    fn from(err: Error) -> Self {
        CaptureError::CaptureFailure(err)
    }
}

/// A validated request to capture one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    raw: String,
}

impl CaptureRequest {
    /// Extract `url` from a raw query string such as `url=https%3A%2F%2Fexample.com`.
    ///
    /// Repeated `url` keys are rejected like a missing one: the value is a
    /// list, not a single string.
    pub fn from_query(query: Option<&str>) -> Result<Self, CaptureError> {
        let mut values = url::form_urlencoded::parse(query.unwrap_or("").as_bytes())
            .filter(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned());

        match (values.next(), values.next()) {
            (Some(raw), None) if !raw.is_empty() => Ok(Self { raw }),
            _ => Err(CaptureError::BadRequest),
        }
    }

    /// The target exactly as supplied
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parse the target into something the browser can navigate to
    pub fn target(&self) -> Result<Url, CaptureError> {
        let url = Url::parse(&self.raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", self.raw, e)))?;
        if !NAVIGABLE_SCHEMES.contains(&url.scheme()) {
            return Err(Error::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())).into());
        }
        Ok(url)
    }
}

/// A captured PNG and its pixel dimensions
#[derive(Debug, Clone)]
pub struct CaptureResult {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl CaptureResult {
    pub fn content_type(&self) -> &'static str {
        PNG_CONTENT_TYPE
    }
}

/// Runs captures against a backend; one fresh session per call
pub struct Capturer<B: Backend> {
    backend: Arc<B>,
    config: EngineConfig,
}

impl<B: Backend> Clone for Capturer<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            config: self.config.clone(),
        }
    }
}

impl<B: Backend> Capturer<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self {
            backend: Arc::new(backend),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Capture the page named by `request`.
    ///
    /// Failures are logged here with full detail; callers should only show
    /// [`CaptureError::public_message`].
    pub async fn capture(&self, request: &CaptureRequest) -> Result<CaptureResult, CaptureError> {
        let result = self.run(request).await;
        match &result {
            Err(CaptureError::CaptureFailure(e)) if e.is_timeout() => {
                warn!("Screenshot timed out for {}: {}", request.raw(), e)
            }
            Err(CaptureError::CaptureFailure(e)) => error!("Screenshot error for {}: {}", request.raw(), e),
            _ => {}
        }
        result
    }

    /// One pass through the pipeline.
    ///
    /// Launch and navigation share a single deadline: the navigation timeout
    /// plus [`NAVIGATION_GRACE`]. Every path releases its session before
    /// returning, except the one where that deadline fires. There the worker
    /// is still blocked inside the browser, so the session is detached and
    /// its worker closes the engine concurrently with the error being sent.
    async fn run(&self, request: &CaptureRequest) -> Result<CaptureResult, CaptureError> {
        let target = request.target()?;
        let timeout_ms = self.config.timeout_ms;
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(timeout_ms) + NAVIGATION_GRACE;

        let opened = tokio::time::timeout_at(
            deadline,
            Session::open(self.backend.clone(), self.config.clone()),
        )
        .await;
        let session = match opened {
            Ok(session) => session?,
            Err(_) => {
                // Dropping the pending open leaves the worker without a handle;
                // it closes the engine as soon as the launch returns.
                warn!("browser launch exceeded the capture deadline");
                return Err(Error::Timeout(timeout_ms).into());
            }
        };

        let navigated = tokio::time::timeout_at(deadline, session.goto(target.as_str())).await;
        match navigated {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                release(session).await;
                return Err(e.into());
            }
            Err(_) => {
                warn!("session {} abandoned after navigation deadline", session.id());
                drop(session);
                return Err(Error::Timeout(timeout_ms).into());
            }
        }

        let shot = session.screenshot().await;
        release(session).await;

        let png = shot?;
        let info = PngInfo::inspect(&png)?;
        let expected = self.config.viewport.pixel_size();
        if (info.width, info.height) != expected {
            return Err(Error::RenderError(format!(
                "captured {}x{}, expected {}x{}",
                info.width, info.height, expected.0, expected.1
            ))
            .into());
        }

        Ok(CaptureResult {
            png,
            width: info.width,
            height: info.height,
        })
    }
}

async fn release(session: Session) {
    let id = session.id();
    if let Err(e) = session.close().await {
        warn!("session {} did not close cleanly: {}", id, e);
    }
}
