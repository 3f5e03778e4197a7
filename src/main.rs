use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod db;
mod dispatch;
mod error;
mod handlers;
mod locks;
mod models;
mod seed;
mod store;

#[cfg(test)]
mod testing;

use auth::SessionStore;
use dispatch::DispatchEngine;
use store::SqliteStore;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: config::AppConfig,
    /// Round-robin dispatcher; owns the per-slug locks.
    pub engine: DispatchEngine<SqliteStore>,
    pub sessions: SessionStore,
    /// Argon2 PHC string of ADMIN_PASSWORD, computed once at startup.
    pub admin_password_hash: String,
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn app(state: Arc<AppState>) -> Router {
    let admin_router = Router::new()
        .route("/", get(handlers::admin::admin_index))
        .route(
            "/login",
            get(handlers::admin::login_page).post(handlers::admin::login),
        )
        .route("/logout", get(handlers::admin::logout))
        .route("/dashboard", get(handlers::admin::dashboard))
        .route("/slugs", post(handlers::admin::create_slug))
        .route(
            "/slugs/:id",
            get(handlers::admin::slug_detail).post(handlers::admin::update_slug),
        )
        .route("/slugs/:id/toggle", post(handlers::admin::toggle_slug))
        .route("/slugs/:id/delete", post(handlers::admin::delete_slug))
        .route("/slugs/:id/targets", post(handlers::admin::add_target))
        .route("/targets/:id/toggle", post(handlers::admin::toggle_target))
        .route(
            "/targets/:id/position",
            post(handlers::admin::set_target_position),
        )
        .route("/targets/:id/delete", post(handlers::admin::delete_target));

    Router::new()
        .route("/", get(handlers::admin::index))
        // Liveness probe, independent of dispatch state
        .route("/healthz", get(handlers::redirect::healthz))
        .nest("/admin", admin_router)
        // Slug redirect; static routes above take priority
        .route("/:slug", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; real env vars take precedence
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "zaplink=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting zaplink on {}", config.bind_addr());
    tracing::info!("Base URL: {}", config.base_url);

    let db = db::connect(&config.database_url, 10).await?;
    tracing::info!("Database migrations applied");

    if let Some(path) = &config.links_file {
        let created = seed::import_links_file(&db, path, config.default_delay_ms).await?;
        tracing::info!("Imported {} slug(s) from {}", created, path);
    }

    let slugs = db::get_all_slugs_with_stats(&db).await?;
    let active: Vec<&str> = slugs
        .iter()
        .filter(|s| s.is_active)
        .map(|s| s.slug.as_str())
        .collect();
    tracing::info!("Active slugs: {}", active.join(", "));

    let admin_password_hash = auth::hash_password(&config.admin_password)?;
    let sessions = SessionStore::new(config.session_duration_hours);
    let engine = DispatchEngine::new(SqliteStore::new(db.clone()));

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState {
        db,
        config,
        engine,
        sessions,
        admin_password_hash,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
