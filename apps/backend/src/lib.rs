pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medcards_core::SelectionEngine;

use crate::config::AppConfig;
use crate::db::Database;
use crate::services::feedback::{FeedbackAdapter, OpenAiFeedbackAdapter};
use crate::store::memory::MemoryStore;
use crate::store::Store;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    /// Feedback is skipped when absent.
    pub feedback: Option<Arc<dyn FeedbackAdapter>>,
    pub engine: Arc<SelectionEngine>,
    pub rng: Arc<Mutex<StdRng>>,
    pub feedback_timeout: Duration,
    pub max_commit_attempts: u32,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        feedback: Option<Arc<dyn FeedbackAdapter>>,
        config: &AppConfig,
    ) -> Self {
        let rng = match config.selection_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            feedback,
            engine: Arc::new(SelectionEngine::new(config.engine.clone())),
            rng: Arc::new(Mutex::new(rng)),
            feedback_timeout: config.feedback_timeout,
            max_commit_attempts: config.max_commit_attempts,
        }
    }
}

/// Build the full router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/users", post(routes::users::create))
        .route("/api/users/:user_id", get(routes::users::get))
        .route("/api/users/:user_id/next-case", get(routes::study::next_case))
        .route("/api/users/:user_id/answers", post(routes::study::submit_answer))
        .route("/api/users/:user_id/dashboard", get(routes::dashboard::get))
        .route(
            "/api/users/:user_id/interactions",
            get(routes::users::interactions),
        )
        .route(
            "/api/users/:user_id/chat-messages",
            get(routes::chat::list).post(routes::chat::append),
        )
        .route("/api/cases", post(routes::cases::import))
        .route("/api/cases/:case_id", get(routes::cases::get))
        .route("/api/badges", get(routes::badges::list))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            tracing::info!("Connecting to database...");
            let db = Database::connect(url).await?;

            tracing::info!("Running migrations...");
            db.run_migrations().await?;
            Arc::new(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };
    services::badges::ensure_default_badges(store.as_ref()).await?;

    let feedback: Option<Arc<dyn FeedbackAdapter>> = match &config.feedback {
        Some(settings) => {
            tracing::info!(model = %settings.model, "Feedback adapter enabled");
            Some(Arc::new(OpenAiFeedbackAdapter::new(settings)?))
        }
        None => {
            tracing::info!("FEEDBACK_API_URL not set, feedback disabled");
            None
        }
    };

    let state = AppState::new(store, feedback, &config);
    let app = build_router(state);

    let addr = config.bind_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
