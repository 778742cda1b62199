pub mod exposition;
pub mod scrape_log;

pub use exposition::{METRIC_NAME, render, write_exposition};
pub use scrape_log::{ScrapeOutcomeKind, ScrapeRecord};
