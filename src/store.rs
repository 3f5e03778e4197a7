use crate::{db, models::Slug};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;

/// Persistence operations the dispatch engine depends on.
///
/// `set_cursor` must not return `Ok` until the new position is durable, and
/// must behave as an idempotent upsert.
#[async_trait]
pub trait DispatchStore: Clone + Send + Sync + 'static {
    /// Slug configuration by public code, active or not.
    async fn slug_config(&self, code: &str) -> Result<Option<Slug>, sqlx::Error>;

    /// Active target addresses in rotation order. May be empty.
    async fn active_targets_in_order(&self, slug_id: i64) -> Result<Vec<String>, sqlx::Error>;

    async fn get_cursor(&self, slug_id: i64) -> Result<Option<i64>, sqlx::Error>;

    async fn set_cursor(&self, slug_id: i64, position: i64) -> Result<(), sqlx::Error>;

    async fn append_click(
        &self,
        slug_id: i64,
        address: &str,
        clicked_at: NaiveDateTime,
    ) -> Result<(), sqlx::Error>;
}

/// [`DispatchStore`] backed by the application's SQLite pool.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DispatchStore for SqliteStore {
    async fn slug_config(&self, code: &str) -> Result<Option<Slug>, sqlx::Error> {
        db::get_slug_by_code(&self.pool, code).await
    }

    async fn active_targets_in_order(&self, slug_id: i64) -> Result<Vec<String>, sqlx::Error> {
        db::active_targets_in_order(&self.pool, slug_id).await
    }

    async fn get_cursor(&self, slug_id: i64) -> Result<Option<i64>, sqlx::Error> {
        db::get_cursor(&self.pool, slug_id).await
    }

    async fn set_cursor(&self, slug_id: i64, position: i64) -> Result<(), sqlx::Error> {
        db::set_cursor(&self.pool, slug_id, position).await
    }

    async fn append_click(
        &self,
        slug_id: i64,
        address: &str,
        clicked_at: NaiveDateTime,
    ) -> Result<(), sqlx::Error> {
        db::log_click(&self.pool, slug_id, address, clicked_at).await
    }
}
