pub mod api;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;

use std::sync::Arc;
use config::Config;
use error::Result;
use fetcher::Fetcher;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::new(&config.fetch)?;
        Ok(AppState {
            config: Arc::new(config),
            fetcher,
        })
    }
}
