use crate::api_state::ApiContext;
use crate::create_router;
use app_state::AppSettings;
use axum::routing::get_service;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use common_services::database::PgStore;
use common_services::faces::HttpFaceExtractor;
use common_services::storage::FsStorage;
use http::{HeaderValue, header};
use ingestion::context::ServiceContext;
use ingestion::reaper::run_reaper;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub async fn serve(settings: AppSettings) -> Result<()> {
    info!("🚀 Initializing server...");

    info!("Connecting to database.");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.secrets.database_url)
        .await?;
    let store = PgStore::new(pool.clone());
    store.migrate().await?;

    let storage = FsStorage::new(
        settings.storage.blob_folder.clone(),
        &settings.storage.public_base_url,
    );
    let extractor = HttpFaceExtractor::new(
        &settings.ingestion.extractor_url,
        Duration::from_secs(settings.limits.fetch_timeout_seconds),
    );

    let ctx = Arc::new(ServiceContext::new(
        settings.clone(),
        Arc::new(store),
        Arc::new(storage),
        Arc::new(extractor),
    ));
    tokio::spawn(run_reaper(ctx.clone()));

    let api_state = ApiContext {
        ctx,
        pool,
    };

    // --- CORS Configuration ---
    let allowed_origins: Vec<HeaderValue> = settings
        .api
        .allowed_origins
        .iter()
        .filter_map(|s| match s.parse() {
            Ok(hv) => Some(hv),
            Err(e) => {
                error!("Invalid CORS origin configured: {} - Error: {}", s, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_origin(allowed_origins)
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::ORIGIN,
            header::USER_AGENT,
            header::CACHE_CONTROL,
        ]);

    // Ingested photo blobs are served straight from the blob folder.
    let serve_dir = ServeDir::new(&settings.storage.blob_folder);

    let app = create_router(api_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .nest_service("/media", get_service(serve_dir));

    let addr: SocketAddr = format!("{}:{}", settings.api.host, settings.api.port)
        .parse()
        .map_err(|e| eyre!("Invalid address: {}", e))?;

    info!("🐸 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
