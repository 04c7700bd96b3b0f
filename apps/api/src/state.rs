use std::sync::Arc;

use crate::config::Config;
use crate::storage::WorksheetStore;
use crate::worksheet::WorksheetConfig;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Pluggable worksheet destination. Default: S3WorksheetStore.
    pub store: Arc<dyn WorksheetStore>,
    /// Layout, options and logo, resolved once at startup and shared read-only by builds.
    pub worksheet: Arc<WorksheetConfig>,
}
