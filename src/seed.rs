//! Import of slugs from a JSON links file at startup.
//!
//! The file maps each slug to its configuration:
//!
//! ```json
//! {
//!   "vendas": {
//!     "title": "Sales",
//!     "message": "Olá!",
//!     "imageUrl": "https://cdn.example.com/sales.png",
//!     "delayMs": 1200,
//!     "active": true,
//!     "numbers": ["5511999990001", "5511999990002"]
//!   }
//! }
//! ```
//!
//! Slugs already present in the database are left untouched, so the file
//! only bootstraps a fresh install.

use crate::{
    db,
    models::{is_valid_slug, normalize_phone},
};
use anyhow::Context;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::{collections::BTreeMap, path::Path};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEntry {
    pub title: String,
    #[serde(default)]
    pub message: String,
    pub image_url: Option<String>,
    pub delay_ms: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub numbers: Vec<String>,
}

fn default_active() -> bool {
    true
}

/// Parse a links document. A `BTreeMap` keeps import order deterministic.
pub fn parse_links(raw: &str) -> anyhow::Result<BTreeMap<String, LinkEntry>> {
    serde_json::from_str(raw).context("links file is not a valid slug map")
}

/// Read `path` and insert every slug that does not exist yet. Returns the
/// number of slugs created.
pub async fn import_links_file(
    pool: &SqlitePool,
    path: impl AsRef<Path>,
    default_delay_ms: i64,
) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read links file {}", path.display()))?;
    import_links(pool, parse_links(&raw)?, default_delay_ms).await
}

pub async fn import_links(
    pool: &SqlitePool,
    links: BTreeMap<String, LinkEntry>,
    default_delay_ms: i64,
) -> anyhow::Result<usize> {
    let mut created = 0;

    for (code, entry) in links {
        if !is_valid_slug(&code) {
            tracing::warn!("Skipping links file entry with invalid slug '{}'", code);
            continue;
        }
        if db::get_slug_by_code(pool, &code).await?.is_some() {
            tracing::debug!("Links file entry '{}' already present, skipping", code);
            continue;
        }

        let slug = db::create_slug(
            pool,
            &db::NewSlug {
                slug: &code,
                title: &entry.title,
                message: &entry.message,
                image_url: entry.image_url.as_deref().filter(|s| !s.is_empty()),
                delay_ms: entry.delay_ms.unwrap_or(default_delay_ms).max(0),
                is_active: entry.active,
            },
        )
        .await
        .with_context(|| format!("failed to create slug '{code}'"))?;

        let mut position = 0;
        for raw in &entry.numbers {
            match normalize_phone(raw) {
                Some(phone) => {
                    db::add_target(pool, slug.id, &phone, Some(position)).await?;
                    position += 1;
                }
                None => tracing::warn!("Skipping invalid number '{}' for slug '{}'", raw, code),
            }
        }

        tracing::info!("Imported slug '{}' with {} number(s)", code, position);
        created += 1;
    }

    Ok(created)
}
