//! pronounce-api library interface for testing
//!
//! Exposes the router and application state for integration testing

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use pronounce_common::config::DEFAULT_MAX_UPLOAD_BYTES;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::services::{AudioStager, PronunciationAssessor};

/// Application state shared across handlers
///
/// Read-only after startup; every request works on its own staged file.
#[derive(Clone)]
pub struct AppState {
    /// Speech assessment backend (Azure in production)
    pub assessor: Arc<dyn PronunciationAssessor>,
    /// Staging area for uploaded audio
    pub stager: Arc<AudioStager>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Request body limit applied to `POST /assess`
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(assessor: Arc<dyn PronunciationAssessor>, stager: AudioStager) -> Self {
        Self {
            assessor,
            stager: Arc::new(stager),
            startup_time: Utc::now(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::assess_routes())
        .merge(api::health_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
