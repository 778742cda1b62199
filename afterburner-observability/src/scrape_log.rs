use serde::Serialize;
use tracing::{debug, warn};

/// How a scrape ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeOutcomeKind {
    Success,
    /// Upstream answered non-2xx; forwarded untouched.
    Forwarded,
    Failed,
}

/// Structured record of one scrape, emitted once per `/metrics` request.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeRecord {
    pub outcome: ScrapeOutcomeKind,
    pub status: u16,
    pub readings: usize,
    /// Readings tied to a GPU index rather than the sentinel.
    pub gpu_readings: usize,
    pub latency_ms: f64,
    pub upstream: String,
    pub error_kind: Option<&'static str>,
    pub error: Option<String>,
}

impl ScrapeRecord {
    pub fn emit(&self) {
        match self.outcome {
            ScrapeOutcomeKind::Success => debug!(
                readings = self.readings,
                gpu_readings = self.gpu_readings,
                latency_ms = self.latency_ms,
                upstream = %self.upstream,
                "Scrape served"
            ),
            ScrapeOutcomeKind::Forwarded => debug!(
                status = self.status,
                latency_ms = self.latency_ms,
                upstream = %self.upstream,
                "Forwarded upstream status"
            ),
            ScrapeOutcomeKind::Failed => warn!(
                kind = self.error_kind.unwrap_or("unknown"),
                error = self.error.as_deref().unwrap_or(""),
                latency_ms = self.latency_ms,
                upstream = %self.upstream,
                "Scrape failed"
            ),
        }
    }
}
