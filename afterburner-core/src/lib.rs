pub mod config;
pub mod error;
pub mod model;
pub mod schema;

pub use config::ExporterConfig;
pub use error::{DecodeError, ScrapeError};
pub use model::{GpuDescriptor, MonitorHeader, MonitorSnapshot, SensorReading};
pub use schema::decode;
