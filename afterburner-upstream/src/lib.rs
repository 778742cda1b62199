pub mod client;
pub mod fetcher;
pub mod mock;

pub use client::{ClientError, HttpMonitorClient, MonitorClient, UpstreamRequest, UpstreamResponse};
pub use fetcher::Fetcher;
