use afterburner_core::error::ScrapeError;
use afterburner_core::schema;
use afterburner_observability::exposition;
use afterburner_upstream::{Fetcher, UpstreamResponse};

/// Result of running fetch → decode → render once.
#[derive(Debug)]
pub enum ScrapeOutcome {
    /// Exposition text ready to serve.
    Metrics {
        body: String,
        readings: usize,
        gpu_readings: usize,
    },
    /// Upstream answered non-2xx. Passed through, never decoded.
    Upstream(UpstreamResponse),
    Failed(ScrapeError),
}

/// One scrape. Stages run strictly in sequence and nothing is kept afterwards.
pub async fn scrape(fetcher: &Fetcher) -> ScrapeOutcome {
    let resp = match fetcher.fetch().await {
        Ok(resp) => resp,
        Err(e) => return ScrapeOutcome::Failed(e),
    };
    if !resp.is_success() {
        return ScrapeOutcome::Upstream(resp);
    }

    let snapshot = match schema::decode(&resp.body) {
        Ok(snapshot) => snapshot,
        Err(source) => {
            return ScrapeOutcome::Failed(ScrapeError::Decode {
                path: fetcher.path().to_string(),
                source,
            });
        }
    };

    match exposition::render(&snapshot.readings) {
        Ok(body) => ScrapeOutcome::Metrics {
            body,
            readings: snapshot.readings.len(),
            gpu_readings: snapshot
                .readings
                .iter()
                .filter(|r| r.is_gpu_specific())
                .count(),
        },
        Err(e) => ScrapeOutcome::Failed(e),
    }
}
