//! Chrome DevTools Protocol backend

use crate::idle::{IdleTracker, NetworkSample};
use crate::{Backend, Engine, EngineConfig, Error, Result};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Counts fetch/XHR requests the page has started but not finished.
/// Installed before any document script runs so early requests are seen.
const INFLIGHT_COUNTER: &str = r#"(function(){
    if (window.__pageshot_inflight !== undefined) return;
    window.__pageshot_inflight = 0;
    const done = function(){ window.__pageshot_inflight = Math.max(0, window.__pageshot_inflight - 1); };
    const origFetch = window.fetch;
    if (origFetch) {
        window.fetch = function(){
            window.__pageshot_inflight++;
            return origFetch.apply(this, arguments).finally(done);
        };
    }
    const origSend = XMLHttpRequest.prototype.send;
    XMLHttpRequest.prototype.send = function(){
        window.__pageshot_inflight++;
        this.addEventListener('loadend', done, { once: true });
        return origSend.apply(this, arguments);
    };
})();"#;

const NETWORK_SAMPLE_SCRIPT: &str = r#"JSON.stringify({
    readyStateComplete: document.readyState === 'complete',
    inflight: window.__pageshot_inflight || 0,
    resources: performance.getEntriesByType('resource').length
})"#;

/// Launches a dedicated headless Chrome per session
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpBackend;

impl Backend for CdpBackend {
    type Engine = CdpEngine;

    fn launch(&self, config: &EngineConfig) -> Result<CdpEngine> {
        CdpEngine::new(config.clone())
    }
}

/// CDP-based engine implementation (uses the `headless_chrome` crate)
///
/// Owns one Chrome process and the single tab used for capture. Dropping the
/// engine kills the process.
pub struct CdpEngine {
    browser: Browser,
    tab: Arc<Tab>,
    config: EngineConfig,
}

impl CdpEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let scale_arg = format!(
            "--force-device-scale-factor={}",
            config.viewport.device_scale_factor
        );
        let args = vec![OsStr::new(scale_arg.as_str()), OsStr::new("--hide-scrollbars")];

        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(config.sandbox)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .path(config.chrome_path.clone())
            .args(args)
            .build()
            .map_err(|e| Error::InitializationError(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::InitializationError(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::InitializationError(format!("Failed to create tab: {}", e)))?;

        if let Some(ua) = &config.user_agent {
            tab.set_user_agent(ua, None, None)
                .map_err(|e| Error::InitializationError(format!("Failed to set user agent: {}", e)))?;
        }

        tab.call_method(Page::AddScriptToEvaluateOnNewDocument {
            source: INFLIGHT_COUNTER.to_string(),
            world_name: None,
            include_command_line_api: None,
            run_immediately: None,
        })
        .map_err(|e| Error::InitializationError(format!("Failed to install request counter: {}", e)))?;

        Ok(Self { browser, tab, config })
    }

    fn sample_network(&self) -> Result<NetworkSample> {
        let eval = self
            .tab
            .evaluate(NETWORK_SAMPLE_SCRIPT, false)
            .map_err(|e| Error::LoadError(format!("Network sampling failed: {}", e)))?;

        let raw = eval
            .value
            .ok_or_else(|| Error::LoadError("Network sample returned no value".into()))?;
        let text = raw
            .as_str()
            .ok_or_else(|| Error::LoadError(format!("Network sample returned {}", raw)))?;

        serde_json::from_str(text).map_err(|e| Error::LoadError(format!("Bad network sample payload: {}", e)))
    }

    fn wait_for_network_idle(&self, deadline: Instant) -> Result<()> {
        let mut tracker = IdleTracker::new(
            Duration::from_millis(self.config.idle_ms),
            self.config.idle_max_inflight,
        );
        let poll = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // Navigations triggered by the page itself can briefly break evaluation.
            match self.sample_network() {
                Ok(sample) => {
                    if tracker.observe(sample, Instant::now()) {
                        return Ok(());
                    }
                }
                Err(e) => debug!("network sample skipped: {}", e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::Timeout(self.config.timeout_ms));
            }
            std::thread::sleep(poll.min(deadline - now));
        }
    }
}

fn remaining(deadline: Instant, timeout_ms: u64) -> Result<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        return Err(Error::Timeout(timeout_ms));
    }
    Ok(left)
}

impl Engine for CdpEngine {
    fn load_url(&mut self, url: &str) -> Result<()> {
        let timeout_ms = self.config.timeout_ms;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        self.tab.set_default_timeout(remaining(deadline, timeout_ms)?);
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::LoadError(format!("Navigation failed: {}", e)))?;

        self.tab.set_default_timeout(remaining(deadline, timeout_ms)?);
        self.tab.wait_until_navigated().map_err(|e| {
            if Instant::now() >= deadline {
                Error::Timeout(timeout_ms)
            } else {
                Error::LoadError(format!("Wait for navigation failed: {}", e))
            }
        })?;

        self.wait_for_network_idle(deadline)?;
        debug!("page settled: {}", self.tab.get_url());
        Ok(())
    }

    fn render_png(&self) -> Result<Vec<u8>> {
        // Clip to the viewport so the image never follows the page's scroll height.
        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: f64::from(self.config.viewport.width),
            height: f64::from(self.config.viewport.height),
            scale: 1.0,
        };

        self.tab
            .capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(clip), true)
            .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
    }

    fn close(self) -> Result<()> {
        if let Err(e) = self.tab.close(false) {
            warn!("Failed to close tab cleanly: {}", e);
        }
        // Dropping the browser terminates the Chrome child process.
        drop(self.browser);
        Ok(())
    }
}
