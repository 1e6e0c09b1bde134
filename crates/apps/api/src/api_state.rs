use ingestion::context::ServiceContext;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiContext {
    /// Shared core: metadata store, blob storage, extractor, access codes.
    pub ctx: Arc<ServiceContext>,
    /// Kept separately so the health check can ping the database directly.
    pub pool: PgPool,
}
