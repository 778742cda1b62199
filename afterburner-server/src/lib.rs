pub mod pipeline;
pub mod server;

pub use pipeline::{ScrapeOutcome, scrape};
pub use server::{AppState, build_router};
