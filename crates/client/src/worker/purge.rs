//! Bulk store deletion shared by activation, `CLEAR_CACHE` and reset.

use futures_util::future::join_all;
use swcache_core::{CacheDb, Error};

/// Outcome of deleting a batch of stores.
#[derive(Debug, Default)]
pub(crate) struct Purge {
    /// Stores removed, in the order they were requested.
    pub deleted: Vec<String>,
    pub failed: Vec<(String, Error)>,
}

impl Purge {
    /// `Ok(deleted)` when every deletion succeeded.
    pub fn into_result(self) -> Result<Vec<String>, Error> {
        if self.failed.is_empty() {
            return Ok(self.deleted);
        }
        let detail = self
            .failed
            .iter()
            .map(|(name, e)| format!("{name}: {e}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(Error::PurgeIncomplete(detail))
    }
}

/// Delete `names` concurrently. A failed deletion never stops the others.
pub(crate) async fn delete_stores(db: &CacheDb, names: Vec<String>) -> Purge {
    let results = join_all(names.into_iter().map(|name| async move {
        tracing::info!(store = %name, "deleting cache store");
        let result = db.delete_store(&name).await;
        (name, result)
    }))
    .await;

    let mut purge = Purge::default();
    for (name, result) in results {
        match result {
            Ok(true) => purge.deleted.push(name),
            Ok(false) => tracing::debug!(store = %name, "cache store already gone"),
            Err(e) => {
                tracing::warn!(store = %name, error = %e, "failed to delete cache store");
                purge.failed.push((name, e));
            }
        }
    }
    purge
}
