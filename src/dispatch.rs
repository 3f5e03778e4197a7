//! Round-robin dispatch over a slug's active targets.
//!
//! The read-targets / read-cursor / write-cursor sequence for a slug runs
//! under that slug's mutex, so concurrent clicks on the same slug each see
//! the position left by the previous one. Different slugs never share a lock.

use crate::{error::DispatchError, locks::SlugLocks, models::Slug, store::DispatchStore};

/// Outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub slug: Slug,
    /// Address of the selected target.
    pub address: String,
    /// Index of the selected target within the active list at dispatch time.
    pub position: usize,
}

pub struct DispatchEngine<S> {
    store: S,
    locks: SlugLocks,
}

impl<S: DispatchStore> DispatchEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            locks: SlugLocks::new(),
        }
    }

    #[cfg(test)]
    pub fn locks(&self) -> &SlugLocks {
        &self.locks
    }

    /// Select the next target for `code` and durably advance its cursor.
    ///
    /// Fails without touching the cursor or the click log when the slug is
    /// missing, inactive, or has no active targets. The target is only
    /// returned once the advanced cursor has been persisted; the click record
    /// is written afterwards on a background task.
    pub async fn dispatch(&self, code: &str) -> Result<Dispatched, DispatchError> {
        let slug = match self
            .store
            .slug_config(code)
            .await
            .map_err(DispatchError::Lookup)?
        {
            Some(slug) if slug.is_active => slug,
            _ => return Err(DispatchError::SlugNotFoundOrInactive),
        };

        let lock = self.locks.lock_for(&slug.slug);
        let guard = lock.lock().await;

        let mut targets = self
            .store
            .active_targets_in_order(slug.id)
            .await
            .map_err(DispatchError::Lookup)?;
        if targets.is_empty() {
            return Err(DispatchError::NoActiveTargets);
        }

        let stored = self
            .store
            .get_cursor(slug.id)
            .await
            .map_err(DispatchError::CursorRead)?;
        let (position, next) = rotate(stored, targets.len());

        if let Err(e) = self.store.set_cursor(slug.id, next as i64).await {
            tracing::error!(
                "Cursor write failed for slug '{}' (position {} -> {}): {}",
                slug.slug,
                position,
                next,
                e
            );
            return Err(DispatchError::CursorWrite(e));
        }
        drop(guard);

        let address = targets.swap_remove(position);
        tracing::debug!(
            "Dispatched slug '{}' to {} (position {}, next {})",
            slug.slug,
            address,
            position,
            next
        );

        self.record_click(slug.id, &slug.slug, &address);

        Ok(Dispatched {
            slug,
            address,
            position,
        })
    }

    /// Append the click record in the background. Failures are logged only.
    fn record_click(&self, slug_id: i64, code: &str, address: &str) {
        let store = self.store.clone();
        let code = code.to_owned();
        let address = address.to_owned();
        let clicked_at = chrono::Utc::now().naive_utc();

        tokio::spawn(async move {
            if let Err(e) = store.append_click(slug_id, &address, clicked_at).await {
                tracing::warn!("Failed to log click for slug '{}': {}", code, e);
            }
        });
    }
}

/// Resolve the stored cursor against the current active count and return
/// `(position to serve, next cursor)`.
///
/// A missing, negative, or out-of-range cursor restarts the rotation at 0.
/// `len` must be non-zero.
fn rotate(stored: Option<i64>, len: usize) -> (usize, usize) {
    let position = stored
        .and_then(|p| usize::try_from(p).ok())
        .filter(|p| *p < len)
        .unwrap_or(0);
    (position, (position + 1) % len)
}
