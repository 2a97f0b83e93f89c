//! HTTP API
//!
//! axum router over the service layer. Routes keep their trailing slash:
//!
//! - `POST /voices/` multipart upload (`file`), country taken from a configurable header
//! - `GET /voices/:id/`, `DELETE /voices/:id/`
//! - `GET /stats/`
//! - `GET /questions/`

pub mod dto;
mod error;
mod handlers;

pub use error::status_for;

use anyhow::Context;
use axum::Router;
use axum::extract::{DefaultBodyLimit, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::Database;
use crate::scoring::{OpenAiScorer, Scorer};
use crate::services::{QuestionService, ServiceContext, StatsService, VoiceService};
use crate::storage::{BlobStore, LocalBlobStore};
use crate::transcription::{Transcriber, WhisperClient};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub voices: VoiceService,
    pub stats: StatsService,
    pub questions: QuestionService,
    /// Request header carrying the caller's 2-letter country code
    pub country_header: String,
}

impl AppState {
    pub fn new(
        context: ServiceContext,
        blobs: Arc<dyn BlobStore>,
        transcriber: Arc<dyn Transcriber>,
        scorer: Arc<dyn Scorer>,
        country_header: impl Into<String>,
    ) -> Self {
        Self {
            voices: VoiceService::new(context.clone(), blobs, transcriber, scorer),
            stats: StatsService::new(context.clone()),
            questions: QuestionService::new(context),
            country_header: country_header.into(),
        }
    }

    /// Wire up the production collaborators described by `config`
    pub fn from_config(config: &Config, db: &Database) -> crate::error::Result<Self> {
        let transcriber = WhisperClient::new(&config.transcription)?;
        let scorer = OpenAiScorer::new(&config.scoring)?;
        let blobs = LocalBlobStore::new(&config.storage.media_dir);

        Ok(Self::new(
            ServiceContext::new(db.pool().clone()),
            Arc::new(blobs),
            Arc::new(transcriber),
            Arc::new(scorer),
            config.server.country_header.clone(),
        ))
    }
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/voices/",
            post(handlers::create_voice).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/voices/:id/",
            get(handlers::get_voice).delete(handlers::delete_voice),
        )
        .route("/stats/", get(handlers::stats))
        .route("/questions/", get(handlers::list_questions))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        "{} {} -> {} ({} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_millis()
    );
    response
}

/// Open the database, bind the listener and serve until Ctrl+C
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let db = Database::connect(&config.database.path)
        .await
        .context("Failed to open database")?;
    db.run_migrations()
        .await
        .context("Failed to run database migrations")?;

    let state = AppState::from_config(config, &db).context("Failed to build services")?;
    let app = router(state, config.server.max_upload_bytes);

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    tracing::info!(
        "Transcription host: {}, media dir: {}",
        config.transcription.host,
        config.storage.media_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    db.close().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
