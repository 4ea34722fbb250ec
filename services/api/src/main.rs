mod error;
mod extractors;
mod sync;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wellmap_common::types::ServiceInfo;
use wellmap_config::{init_tracing, load_all};
use wellmap_ingest::sync::engine::{PgWellSyncer, SyncTrigger};

use crate::extractors::SYNC_SECRET_HEADER;

#[derive(Clone)]
pub struct AppState {
    pub trigger: Arc<dyn SyncTrigger>,
    pub sync_secret: Arc<str>,
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info() -> Json<ServiceInfo> {
    Json(ServiceInfo::new("wellmap-api", env!("CARGO_PKG_VERSION")))
}

fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:3000"),
            HeaderValue::from_static("http://127.0.0.1:3000"),
        ])
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static(SYNC_SECRET_HEADER),
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/info", get(info))
        .merge(sync::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    init_tracing("info");

    let (config, sync_config) = load_all().expect("failed to load config");
    let secret = config
        .require_sync_secret()
        .expect("SYNC_SECRET must be set to serve the sync trigger");
    tracing::info!(
        service = "wellmap-api",
        source = %sync_config.source,
        layer = %sync_config.layer,
        "starting"
    );

    let pool = wellmap_db::create_pool(&config.database_url)
        .await
        .expect("failed to create database pool");
    wellmap_db::run_migrations(&pool)
        .await
        .expect("failed to apply migrations");

    let syncer = PgWellSyncer::from_pool(pool, &sync_config).expect("failed to build syncer");
    let state = AppState {
        trigger: Arc::new(syncer),
        sync_secret: Arc::from(secret),
    };

    let app = build_router(state);
    let addr: SocketAddr = config.bind_addr().parse().expect("invalid bind address");

    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app).await.expect("server error");
}
