use afterburner_core::config::ServerConfig;
use afterburner_observability::{ScrapeOutcomeKind, ScrapeRecord};
use afterburner_upstream::{Fetcher, UpstreamResponse};
use axum::{
    Router as AxumRouter,
    extract::State,
    http::{HeaderValue, StatusCode, header::CONTENT_TYPE},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::pipeline::{self, ScrapeOutcome};

/// Content type of the Prometheus text format.
pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const INDEX_HTML: &str = r#"<html>
<head><title>Afterburner Exporter</title></head>
<body>
<h1>Afterburner Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

/// Shared, read-only state for the scrape endpoint.
pub struct AppState {
    pub fetcher: Fetcher,
}

/// Build the Axum router: landing page and `/metrics`.
pub fn build_router(state: Arc<AppState>) -> AxumRouter {
    AxumRouter::new()
        .route("/", get(index_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start(
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen.as_str()).await?;
    info!(addr = %listener.local_addr()?, "Listening for scrapes");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Prometheus scrape endpoint handler.
///
/// Local failures answer `200` with a one-line message. An upstream non-2xx
/// is replayed with its own status and body.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();
    let outcome = pipeline::scrape(&state.fetcher).await;

    let mut record = ScrapeRecord {
        outcome: ScrapeOutcomeKind::Success,
        status: StatusCode::OK.as_u16(),
        readings: 0,
        gpu_readings: 0,
        latency_ms: 0.0,
        upstream: state.fetcher.url().to_string(),
        error_kind: None,
        error: None,
    };

    let response = match outcome {
        ScrapeOutcome::Metrics {
            body,
            readings,
            gpu_readings,
        } => {
            record.readings = readings;
            record.gpu_readings = gpu_readings;
            ([(CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body).into_response()
        }
        ScrapeOutcome::Upstream(resp) => {
            record.outcome = ScrapeOutcomeKind::Forwarded;
            record.status = resp.status;
            forward_upstream(resp)
        }
        ScrapeOutcome::Failed(e) => {
            record.outcome = ScrapeOutcomeKind::Failed;
            record.error_kind = Some(e.kind());
            let message = e.to_string();
            record.error = Some(message.clone());
            (
                StatusCode::OK,
                [(CONTENT_TYPE, "text/plain; charset=utf-8")],
                message,
            )
                .into_response()
        }
    };

    record.latency_ms = started.elapsed().as_secs_f64() * 1000.0;
    record.emit();
    response
}

fn forward_upstream(resp: UpstreamResponse) -> Response {
    let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = (status, resp.body).into_response();
    if let Some(value) = resp
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
    {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}
