use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lazily created per-slug mutexes.
///
/// Backed by a DashMap so looking up the lock for one slug never contends
/// with another slug's dispatch. Entries are never removed: the key space is
/// bounded by the slugs an admin has created, and callers only ask for a lock
/// after the slug has been confirmed to exist.
#[derive(Clone, Debug, Default)]
pub struct SlugLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl SlugLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the mutex guarding `slug`, creating it on first use.
    ///
    /// The map shard guard is released before this returns, so the caller
    /// may hold the returned lock across `.await` points.
    pub fn lock_for(&self, slug: &str) -> Arc<Mutex<()>> {
        if let Some(existing) = self.inner.get(slug) {
            return existing.clone();
        }
        self.inner
            .entry(slug.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of slugs that have been dispatched at least once.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slug_shares_one_mutex() {
        let locks = SlugLocks::new();
        let a = locks.lock_for("promo");
        let b = locks.lock_for("promo");
        let c = locks.lock_for("other");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn holding_one_slug_does_not_block_another() {
        let locks = SlugLocks::new();
        let promo = locks.lock_for("promo");
        let _held = promo.lock().await;

        let other = locks.lock_for("other");
        assert!(other.try_lock().is_ok());
        assert!(locks.lock_for("promo").try_lock().is_err());
    }
}
