use std::sync::Arc;

use sqlx::PgPool;

use crate::config::MetadataSettings;

/// Shared application state passed to all handlers and extractors.
/// JWT secret is stored here (read once at startup) rather than re-reading
/// from the environment on every request, and the reqwest client is shared
/// so batch hydration reuses its connection pool.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_secret: Arc<str>,
    pub http_client: reqwest::Client,
    pub metadata: MetadataSettings,
}
