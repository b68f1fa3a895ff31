//! Common test utilities and fixtures for integration tests.
//!
//! Tests run against the in-memory store seeded with a small case catalog
//! and the default badges. Selection uses a fixed seed so case choices are
//! reproducible. Tests marked `#[ignore = "requires database"]` need
//! DATABASE_URL pointing at a PostgreSQL instance.

#![allow(dead_code)]

pub mod fixtures;
pub mod flaky;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use medcards_backend::config::AppConfig;
use medcards_backend::db::Database;
use medcards_backend::services::badges::ensure_default_badges;
use medcards_backend::services::feedback::{CannedFeedbackAdapter, FeedbackAdapter};
use medcards_backend::store::memory::MemoryStore;
use medcards_backend::store::Store;
use medcards_backend::{build_router, AppState};

pub const TEST_SEED: u64 = 42;

/// Test context holding the store and router.
pub struct TestContext {
    pub store: Arc<dyn Store>,
    pub feedback: Arc<CannedFeedbackAdapter>,
    app: Router,
}

impl TestContext {
    /// In-memory context with canned feedback.
    pub async fn new() -> Self {
        Self::with_feedback(CannedFeedbackAdapter::new(), test_config()).await
    }

    /// In-memory context with a custom feedback adapter and config.
    pub async fn with_feedback(adapter: CannedFeedbackAdapter, config: AppConfig) -> Self {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        Self::build(store, adapter, config).await
    }

    /// Context over a caller-supplied store, e.g. a [`flaky::FlakyStore`].
    pub async fn with_store(store: Arc<dyn Store>, config: AppConfig) -> Self {
        Self::build(store, CannedFeedbackAdapter::new(), config).await
    }

    /// Context backed by PostgreSQL.
    ///
    /// # Panics
    /// Panics if DATABASE_URL is not set or database connection fails.
    pub async fn postgres() -> Self {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");

        let db = Database::connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        db.run_migrations()
            .await
            .expect("Failed to run migrations");

        Self::build(Arc::new(db), CannedFeedbackAdapter::new(), test_config()).await
    }

    async fn build(store: Arc<dyn Store>, adapter: CannedFeedbackAdapter, config: AppConfig) -> Self {
        for case in fixtures::seed_cases() {
            store.upsert_case(&case).await.expect("Failed to seed case");
        }
        ensure_default_badges(store.as_ref())
            .await
            .expect("Failed to seed badges");

        let feedback = Arc::new(adapter);
        let adapter: Arc<dyn FeedbackAdapter> = feedback.clone();
        let state = AppState::new(store.clone(), Some(adapter), &config);

        Self {
            store,
            feedback,
            app: build_router(state),
        }
    }

    /// Get the router for use with axum-test.
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router()).unwrap()
    }

    /// Register a user with a unique email and return its id.
    pub async fn create_user(&self, server: &TestServer) -> Uuid {
        let response = server
            .post("/api/users")
            .json(&json!({
                "email": format!("{}@example.com", Uuid::new_v4()),
                "full_name": "Test Student"
            }))
            .await;
        let body: Value = response.json();
        body["id"].as_str().unwrap().parse().unwrap()
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        selection_seed: Some(TEST_SEED),
        feedback_timeout: Duration::from_millis(500),
        ..AppConfig::default()
    }
}
