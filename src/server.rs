//! HTTP surface: `GET /api/screenshot?url=<target>`

use crate::capture::{CaptureError, CaptureRequest, Capturer};
use crate::config::ServerConfig;
use crate::Backend;
use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state handed to every request; configured once at startup
pub struct AppState<B: Backend> {
    pub capturer: Capturer<B>,
}

impl<B: Backend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            capturer: self.capturer.clone(),
        }
    }
}

impl<B: Backend> AppState<B> {
    pub fn new(capturer: Capturer<B>) -> Self {
        Self { capturer }
    }
}

impl IntoResponse for CaptureError {
    fn into_response(self) -> Response {
        let status = match self {
            CaptureError::BadRequest => StatusCode::BAD_REQUEST,
            CaptureError::CaptureFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.public_message()).into_response()
    }
}

/// Build the service router.
///
/// `allowed_origin` is stamped on every response, including the ones
/// produced for unknown routes.
pub fn router<B: Backend>(state: AppState<B>, allowed_origin: HeaderValue) -> Router {
    Router::new()
        .route("/api/screenshot", get(screenshot::<B>))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            allowed_origin,
        ))
}

async fn screenshot<B: Backend>(
    State(state): State<AppState<B>>,
    RawQuery(query): RawQuery,
) -> Result<Response, CaptureError> {
    let request = CaptureRequest::from_query(query.as_deref()).inspect_err(|_| {
        warn!("rejected screenshot request without a single ?url=");
    })?;

    let shot = state.capturer.capture(&request).await?;
    info!(
        url = request.raw(),
        bytes = shot.png.len(),
        "captured {}x{}",
        shot.width,
        shot.height
    );

    Ok(([(header::CONTENT_TYPE, shot.content_type())], shot.png).into_response())
}

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve<B: Backend>(config: &ServerConfig, backend: B) -> anyhow::Result<()> {
    let origin = config.origin_header()?;
    let capturer = Capturer::new(backend, config.engine_config()?);
    let app = router(AppState::new(capturer), origin);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Screenshot service listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
