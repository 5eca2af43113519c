//! Network quiescence detection
//!
//! The page is sampled periodically; each [`NetworkSample`] is fed to an
//! [`IdleTracker`] which decides when activity has stayed low for long
//! enough. Sampling itself is backend specific (see `cdp.rs`).

use serde::Deserialize;
use std::time::{Duration, Instant};

/// One observation of the page's loading state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSample {
    /// `document.readyState == "complete"`
    pub ready_state_complete: bool,
    /// Requests started by the page that have not finished yet
    pub inflight: u32,
    /// Resources the page has finished loading so far
    pub resources: u32,
}

/// Decides when a page has gone quiet
#[derive(Debug)]
pub struct IdleTracker {
    window: Duration,
    max_inflight: u32,
    quiet_since: Option<Instant>,
    last_resources: Option<u32>,
}

impl IdleTracker {
    pub fn new(window: Duration, max_inflight: u32) -> Self {
        Self {
            window,
            max_inflight,
            quiet_since: None,
            last_resources: None,
        }
    }

    /// Record a sample taken at `now`; returns true once the page is idle.
    pub fn observe(&mut self, sample: NetworkSample, now: Instant) -> bool {
        let resources_stable = self.last_resources == Some(sample.resources);
        self.last_resources = Some(sample.resources);

        let quiet = sample.ready_state_complete
            && sample.inflight <= self.max_inflight
            && resources_stable;

        if !quiet {
            self.quiet_since = None;
            return false;
        }

        let since = *self.quiet_since.get_or_insert(now);
        now.duration_since(since) >= self.window
    }

    /// Whether the current quiet streak has started
    pub fn is_quiet(&self) -> bool {
        self.quiet_since.is_some()
    }
}
