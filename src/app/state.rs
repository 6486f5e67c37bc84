//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::game::TossEngine;
use crate::util::rate_limit::{create_limiter, Limiter};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<TossEngine>,
    /// Global budget for HTTP requests
    pub request_limiter: Arc<Limiter>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        // Initialize match engine
        let engine = Arc::new(TossEngine::new(config.timings, config.toss_seed));

        let request_limiter = create_limiter(config.http_rate_limit);

        Self {
            config,
            engine,
            request_limiter,
        }
    }
}
