//! Shared fixtures for unit tests.

use crate::{
    auth::{self, SessionStore},
    config::AppConfig,
    db,
    dispatch::DispatchEngine,
    models::Slug,
    store::SqliteStore,
    AppState,
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::{str::FromStr, sync::Arc};

pub const ADMIN_PASSWORD: &str = "correct horse";

/// Single-connection in-memory database with migrations applied. The
/// connection is never recycled so the data lives as long as the pool.
pub async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

/// Create an active slug with the given numbers at positions 0..n.
pub async fn seed_slug(pool: &SqlitePool, code: &str, phones: &[&str]) -> Slug {
    let slug = db::create_slug(
        pool,
        &db::NewSlug {
            slug: code,
            title: "Sales Team",
            message: "Olá, quero saber mais!",
            image_url: Some("https://cdn.example.com/avatar.png"),
            delay_ms: 1500,
            is_active: true,
        },
    )
    .await
    .unwrap();

    for (position, phone) in phones.iter().enumerate() {
        db::add_target(pool, slug.id, phone, Some(position as i64))
            .await
            .unwrap();
    }

    slug
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        admin_password: ADMIN_PASSWORD.into(),
        host: "127.0.0.1".into(),
        port: 3000,
        base_url: "http://localhost:3000".into(),
        session_duration_hours: 1,
        root_redirect_url: "https://example.com".into(),
        default_delay_ms: 1500,
        links_file: None,
    }
}

pub async fn test_state(pool: SqlitePool) -> Arc<AppState> {
    let config = test_config();
    Arc::new(AppState {
        engine: DispatchEngine::new(SqliteStore::new(pool.clone())),
        admin_password_hash: auth::hash_password(&config.admin_password).unwrap(),
        sessions: SessionStore::new(config.session_duration_hours),
        db: pool,
        config,
    })
}

/// Wait until the background click writer has caught up.
pub async fn wait_for_clicks(pool: &SqlitePool, slug_id: i64, expected: i64) {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let count = db::count_clicks(pool, slug_id).await.unwrap();
        if count >= expected || tokio::time::Instant::now() > deadline {
            assert_eq!(count, expected);
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}
