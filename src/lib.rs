//! voxcheck library interface
//!
//! Exposes the detection pipeline and HTTP surface for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

use crate::services::Pipeline;

/// Application state shared across handlers
///
/// The pipeline carries the process-lifetime model instances (classifier
/// artifact and language model); everything inside is read-only after
/// startup, so cloning the state is cheap and lock-free.
#[derive(Clone)]
pub struct AppState {
    /// Detection pipeline over the preloaded models
    pub pipeline: Arc<Pipeline>,
    /// Accepted `x-api-key` values
    pub api_keys: Arc<HashSet<String>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, api_keys: HashSet<String>) -> Self {
        Self {
            pipeline,
            api_keys: Arc::new(api_keys),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::detection_routes())
        .merge(api::health_routes())
        .with_state(state)
}
