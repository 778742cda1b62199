use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::CONTENT_TYPE;
use std::error::Error as StdError;
use std::time::Duration;

/// One GET against the Afterburner remote server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamRequest {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Whatever the server answered, success or not, with the body buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No HTTP response was received: refused, timed out, DNS, bad URL.
    #[error("{0}")]
    Request(String),
    /// A response arrived but its body could not be read.
    #[error("{0}")]
    Body(String),
}

impl ClientError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Request(_))
    }
}

/// Perform one HTTP GET with basic auth.
#[async_trait]
pub trait MonitorClient: Send + Sync {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, ClientError>;
}

/// `reqwest`-backed client. Cheap to share: the inner client pools connections.
#[derive(Debug, Clone)]
pub struct HttpMonitorClient {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpMonitorClient {
    /// `timeout` bounds each attempt, body read included.
    pub fn new(timeout: Duration, max_body_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            max_body_bytes,
        })
    }
}

#[async_trait]
impl MonitorClient for HttpMonitorClient {
    async fn get(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, ClientError> {
        let mut resp = self
            .client
            .get(&request.url)
            .basic_auth(&request.username, Some(&request.password))
            .send()
            .await
            .map_err(|e| ClientError::Request(error_chain(&e)))?;

        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if let Some(len) = resp.content_length() {
            if len > self.max_body_bytes as u64 {
                return Err(ClientError::Body(format!(
                    "body of {len} bytes exceeds limit of {} bytes",
                    self.max_body_bytes
                )));
            }
        }

        let mut body = BytesMut::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| ClientError::Body(error_chain(&e)))?
        {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(ClientError::Body(format!(
                    "body exceeds limit of {} bytes",
                    self.max_body_bytes
                )));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status,
            content_type,
            body: body.freeze(),
        })
    }
}

/// `reqwest` keeps the useful part (refused, timed out) in the source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
