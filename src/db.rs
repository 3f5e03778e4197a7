use crate::models::{ClickRecord, Slug, SlugDetail, SlugWithStats, Target, TargetWithStats};
use chrono::NaiveDateTime;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool,
};
use std::collections::HashMap;

const SLUG_COLUMNS: &str =
    "id, slug, title, message, image_url, delay_ms, is_active, created_at";
const TARGET_COLUMNS: &str = "id, slug_id, phone, position, is_active, created_at";

// ── Setup ──────────────────────────────────────────────────────────────────

/// Open the SQLite pool and apply embedded migrations.
///
/// The file is created if missing. `synchronous = FULL` makes every commit
/// (cursor upserts in particular) durable before the query returns.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

// ── Slugs ──────────────────────────────────────────────────────────────────

/// Fields accepted when creating a slug.
#[derive(Debug, Clone)]
pub struct NewSlug<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub message: &'a str,
    pub image_url: Option<&'a str>,
    pub delay_ms: i64,
    pub is_active: bool,
}

/// Insert a new slug and return the newly created row.
pub async fn create_slug(pool: &SqlitePool, new: &NewSlug<'_>) -> Result<Slug, sqlx::Error> {
    let id = sqlx::query(
        "INSERT INTO slugs (slug, title, message, image_url, delay_ms, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(new.slug)
    .bind(new.title)
    .bind(new.message)
    .bind(new.image_url)
    .bind(new.delay_ms)
    .bind(new.is_active)
    .execute(pool)
    .await?
    .last_insert_rowid();

    sqlx::query_as(&format!("SELECT {SLUG_COLUMNS} FROM slugs WHERE id = ?1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

/// Fetch a slug by its public code, active or not.
pub async fn get_slug_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Slug>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {SLUG_COLUMNS} FROM slugs WHERE slug = ?1"))
        .bind(code)
        .fetch_optional(pool)
        .await
}

/// Fetch a slug by its primary key.
pub async fn get_slug_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Slug>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {SLUG_COLUMNS} FROM slugs WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Update the display settings of a slug. Returns `false` if it does not exist.
pub async fn update_slug(
    pool: &SqlitePool,
    id: i64,
    title: &str,
    message: &str,
    image_url: Option<&str>,
    delay_ms: i64,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query(
        "UPDATE slugs SET title = ?2, message = ?3, image_url = ?4, delay_ms = ?5 WHERE id = ?1",
    )
    .bind(id)
    .bind(title)
    .bind(message)
    .bind(image_url)
    .bind(delay_ms)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(affected > 0)
}

/// Flip the active flag of a slug.
pub async fn toggle_slug(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("UPDATE slugs SET is_active = NOT is_active WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Permanently delete a slug (cascades to targets, cursor and clicks via FK).
pub async fn delete_slug(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("DELETE FROM slugs WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

/// Return all slugs with target and click counts, newest first.
pub async fn get_all_slugs_with_stats(pool: &SqlitePool) -> Result<Vec<SlugWithStats>, sqlx::Error> {
    sqlx::query_as(
        "SELECT s.id,
                s.slug,
                s.title,
                s.is_active,
                s.created_at,
                (SELECT COUNT(*) FROM targets t WHERE t.slug_id = s.id) AS target_count,
                (SELECT COUNT(*) FROM targets t
                  WHERE t.slug_id = s.id AND t.is_active = 1) AS active_target_count,
                (SELECT COUNT(*) FROM clicks c WHERE c.slug_id = s.id) AS click_count
         FROM slugs s
         ORDER BY s.created_at DESC, s.id DESC",
    )
    .fetch_all(pool)
    .await
}

// ── Targets ────────────────────────────────────────────────────────────────

/// Append a target to a slug's rotation.
///
/// With no explicit position the target goes after the current last one.
pub async fn add_target(
    pool: &SqlitePool,
    slug_id: i64,
    phone: &str,
    position: Option<i64>,
) -> Result<Target, sqlx::Error> {
    let position = match position {
        Some(p) => p,
        None => {
            let max: Option<i64> =
                sqlx::query_scalar("SELECT MAX(position) FROM targets WHERE slug_id = ?1")
                    .bind(slug_id)
                    .fetch_one(pool)
                    .await?;
            max.map_or(0, |m| m + 1)
        }
    };

    let id = sqlx::query("INSERT INTO targets (slug_id, phone, position) VALUES (?1, ?2, ?3)")
        .bind(slug_id)
        .bind(phone)
        .bind(position)
        .execute(pool)
        .await?
        .last_insert_rowid();

    sqlx::query_as(&format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"))
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn get_target_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Target>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {TARGET_COLUMNS} FROM targets WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All targets of a slug, active or not, in rotation order.
pub async fn get_targets(pool: &SqlitePool, slug_id: i64) -> Result<Vec<Target>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {TARGET_COLUMNS} FROM targets WHERE slug_id = ?1 ORDER BY position, id"
    ))
    .bind(slug_id)
    .fetch_all(pool)
    .await
}

/// Phone numbers of the active targets of a slug, ordered by position with
/// insertion order (row id) breaking ties.
pub async fn active_targets_in_order(
    pool: &SqlitePool,
    slug_id: i64,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT phone FROM targets
         WHERE slug_id = ?1 AND is_active = 1
         ORDER BY position, id",
    )
    .bind(slug_id)
    .fetch_all(pool)
    .await
}

pub async fn toggle_target(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("UPDATE targets SET is_active = NOT is_active WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

pub async fn set_target_position(
    pool: &SqlitePool,
    id: i64,
    position: i64,
) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("UPDATE targets SET position = ?2 WHERE id = ?1")
        .bind(id)
        .bind(position)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

pub async fn delete_target(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let affected = sqlx::query("DELETE FROM targets WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(affected > 0)
}

// ── Cursors ────────────────────────────────────────────────────────────────

/// Stored rotation position for a slug, or `None` before the first dispatch.
pub async fn get_cursor(pool: &SqlitePool, slug_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT position FROM cursors WHERE slug_id = ?1")
        .bind(slug_id)
        .fetch_optional(pool)
        .await
}

/// Upsert the rotation position for a slug. The write is committed before
/// this returns.
pub async fn set_cursor(pool: &SqlitePool, slug_id: i64, position: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cursors (slug_id, position, updated_at)
         VALUES (?1, ?2, CURRENT_TIMESTAMP)
         ON CONFLICT(slug_id) DO UPDATE SET
           position = excluded.position,
           updated_at = excluded.updated_at",
    )
    .bind(slug_id)
    .bind(position)
    .execute(pool)
    .await?;

    Ok(())
}

// ── Clicks ─────────────────────────────────────────────────────────────────

/// Record a dispatch. Called from a spawned background task so the redirect
/// is never blocked by the log write.
pub async fn log_click(
    pool: &SqlitePool,
    slug_id: i64,
    phone: &str,
    clicked_at: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO clicks (slug_id, phone, clicked_at) VALUES (?1, ?2, ?3)")
        .bind(slug_id)
        .bind(phone)
        .bind(clicked_at)
        .execute(pool)
        .await?;

    Ok(())
}

pub async fn count_clicks(pool: &SqlitePool, slug_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM clicks WHERE slug_id = ?1")
        .bind(slug_id)
        .fetch_one(pool)
        .await
}

/// Load the slug, its targets with per-number click counts, the stored cursor
/// and the 50 most recent clicks.
pub async fn get_slug_detail(pool: &SqlitePool, id: i64) -> Result<Option<SlugDetail>, sqlx::Error> {
    let slug = match get_slug_by_id(pool, id).await? {
        Some(s) => s,
        None => return Ok(None),
    };

    let per_phone: HashMap<String, i64> = sqlx::query_as::<_, (String, i64)>(
        "SELECT phone, COUNT(*) FROM clicks WHERE slug_id = ?1 GROUP BY phone",
    )
    .bind(id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let targets = get_targets(pool, id)
        .await?
        .into_iter()
        .map(|target| TargetWithStats {
            click_count: per_phone.get(&target.phone).copied().unwrap_or(0),
            target,
        })
        .collect();

    let cursor = get_cursor(pool, id).await?;
    let total_clicks = count_clicks(pool, id).await?;

    let recent_clicks: Vec<ClickRecord> = sqlx::query_as(
        "SELECT id, slug_id, phone, clicked_at FROM clicks
         WHERE slug_id = ?1
         ORDER BY clicked_at DESC, id DESC
         LIMIT 50",
    )
    .bind(id)
    .fetch_all(pool)
    .await?;

    Ok(Some(SlugDetail {
        slug,
        targets,
        cursor,
        total_clicks,
        recent_clicks,
    }))
}
