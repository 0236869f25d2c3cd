//! Game-State Persistence
//!
//! The engine's persistence seam: versioned rows with optimistic
//! concurrency. A save against a stale version surfaces as a retryable
//! conflict instead of silently losing the other writer's update.

use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// A stored row with its optimistic-concurrency version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedRow {
    /// Monotonic row version, starting at 1.
    pub version: u64,
    /// Row payload (bincode-encoded state).
    pub bytes: Vec<u8>,
}

/// Persistence errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Another writer updated the row first; retry with a fresh load.
    #[error("version conflict on '{id}': expected {expected:?}, found {actual:?}")]
    Conflict {
        /// Row identifier.
        id: String,
        /// Version the writer expected.
        expected: Option<u64>,
        /// Version actually stored.
        actual: Option<u64>,
    },
}

/// Persistence seam for game-state rows.
///
/// `save` with `expected_version: None` creates the row; `Some(v)` updates
/// it only if the stored version is still `v`. Both return the new version.
#[allow(async_fn_in_trait)]
pub trait StateStore: Send + Sync {
    /// Load a row, or None if absent.
    async fn load(&self, id: &str) -> Result<Option<VersionedRow>, StoreError>;

    /// Save a row under compare-and-swap semantics.
    async fn save(
        &self,
        id: &str,
        bytes: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;
}

/// In-memory store used by tests and the demo binary.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<String, VersionedRow>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored.
    pub async fn row_count(&self) -> usize {
        self.rows.read().await.len()
    }
}

impl StateStore for MemoryStore {
    async fn load(&self, id: &str) -> Result<Option<VersionedRow>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.get(id).cloned())
    }

    async fn save(
        &self,
        id: &str,
        bytes: Vec<u8>,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().await;
        let actual = rows.get(id).map(|r| r.version);

        if actual != expected_version {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected_version,
                actual,
            });
        }

        let version = expected_version.unwrap_or(0) + 1;
        rows.insert(id.to_string(), VersionedRow { version, bytes });
        Ok(version)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_load() {
        let store = MemoryStore::new();

        let version = store.save("row-1", vec![1, 2, 3], None).await.unwrap();
        assert_eq!(version, 1);

        let row = store.load("row-1").await.unwrap().unwrap();
        assert_eq!(row.version, 1);
        assert_eq!(row.bytes, vec![1, 2, 3]);

        assert!(store.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let store = MemoryStore::new();
        store.save("row-1", vec![1], None).await.unwrap();

        let version = store.save("row-1", vec![2], Some(1)).await.unwrap();
        assert_eq!(version, 2);

        let row = store.load("row-1").await.unwrap().unwrap();
        assert_eq!(row.bytes, vec![2]);
    }

    #[tokio::test]
    async fn test_create_over_existing_conflicts() {
        let store = MemoryStore::new();
        store.save("row-1", vec![1], None).await.unwrap();

        let result = store.save("row-1", vec![2], None).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let store = MemoryStore::new();
        store.save("row-1", vec![1], None).await.unwrap();
        store.save("row-1", vec![2], Some(1)).await.unwrap();

        // A writer still holding version 1 must not clobber version 2.
        let result = store.save("row-1", vec![3], Some(1)).await;
        match result {
            Err(StoreError::Conflict { expected, actual, .. }) => {
                assert_eq!(expected, Some(1));
                assert_eq!(actual, Some(2));
            }
            other => panic!("expected conflict, got {:?}", other),
        }

        let row = store.load("row-1").await.unwrap().unwrap();
        assert_eq!(row.bytes, vec![2], "losing writer must not be applied");
    }
}
