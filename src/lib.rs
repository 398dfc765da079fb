pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod extract;
pub mod logging;
pub mod middleware;
pub mod models;
pub mod routes;

use anyhow::{anyhow, Context, Result};
use axum::middleware::from_fn;
use axum::{routing::get, Extension, Router};
use tracing::info;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{Config, Runtime};
use crate::db::SqliteRepository;
use crate::docs::ApiDoc;
use crate::middleware::request_logger;
use crate::routes::{health, items, root};

pub fn create_app(db: SqliteRepository) -> Router {
    Router::new()
        .route("/", get(root::handler))
        .route("/health", get(health::health))
        .route("/items", get(items::list).post(items::create))
        .route("/items/", get(items::list).post(items::create))
        .route(
            "/items/:id",
            get(items::get_by_id).put(items::update).delete(items::delete),
        )
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .layer(from_fn(request_logger))
        .layer(Extension(db))
}

pub async fn run_app(config: Config) -> Result<()> {
    info!(
        environment = %config.environment,
        database_url = %config.database_url,
        runtime = ?config.runtime,
        "Starting inventory API"
    );

    let db = SqliteRepository::new(&config.database_url, config.max_connections)
        .await
        .context("Failed to open the item database")?;
    db.create_tables()
        .await
        .context("Failed to create the inventory_items table")?;
    info!("Database tables created (if not existing)");

    let app = create_app(db);

    match config.runtime {
        Runtime::Lambda => lambda_http::run(app).await.map_err(|err| anyhow!(err)),
        Runtime::Local => {
            let listener = tokio::net::TcpListener::bind(config.listen_addr)
                .await
                .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
            info!(addr = %config.listen_addr, "Inventory API listening");
            axum::serve(listener, app).await?;
            Ok(())
        }
    }
}
