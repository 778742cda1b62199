//! In-memory [`MonitorClient`] for tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::client::{ClientError, MonitorClient, UpstreamRequest, UpstreamResponse};

/// Replays scripted outcomes in order, then keeps returning the last one.
pub struct ScriptedClient {
    outcomes: Mutex<VecDeque<Result<UpstreamResponse, ClientError>>>,
    calls: AtomicUsize,
    last_request: Mutex<Option<UpstreamRequest>>,
}

impl ScriptedClient {
    pub fn new(outcomes: Vec<Result<UpstreamResponse, ClientError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Always answers `200` with `body`.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(vec![Ok(response(200, body))])
    }

    /// Always fails before a response arrives.
    pub fn unreachable(detail: &str) -> Self {
        Self::new(vec![Err(ClientError::Request(detail.to_string()))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<UpstreamRequest> {
        self.last_request.lock().ok().and_then(|r| r.clone())
    }
}

/// Response with the given status and body, typed as XML.
pub fn response(status: u16, body: impl Into<Bytes>) -> UpstreamResponse {
    UpstreamResponse {
        status,
        content_type: Some("text/xml".to_string()),
        body: body.into(),
    }
}

#[async_trait]
impl MonitorClient for ScriptedClient {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        let mut outcomes = match self.outcomes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if outcomes.len() > 1 {
            outcomes
                .pop_front()
                .unwrap_or_else(|| Err(ClientError::Request("script exhausted".into())))
        } else {
            outcomes
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ClientError::Request("script exhausted".into())))
        }
    }
}
