//! An in-memory session store for `kv_session`, geared towards testing and local development.
use jiff::Timestamp;
use std::{collections::HashMap, num::NonZeroUsize, sync::Arc, time::Duration};
use tokio::sync::Mutex;

use kv_session::store::{
    SessionStorageBackend,
    errors::{DeleteError, GetError, SetError},
};

#[derive(Clone)]
/// An in-memory session store.
///
/// Every record is stored with a deadline, computed from the time-to-live
/// passed to [`SessionStorageBackend::set`]. Stale records are never returned,
/// but they are only dropped from memory when they are overwritten, deleted or
/// swept away by [`InMemorySessionStore::delete_expired`].
///
/// # Limitations
///
/// This store won't persist data between server restarts.
/// It also won't synchronize data between multiple server instances.
/// It is primarily intended for testing and local development.
pub struct InMemorySessionStore(Arc<Mutex<HashMap<Vec<u8>, StoreRecord>>>);

impl std::fmt::Debug for InMemorySessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySessionStore")
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct StoreRecord {
    value: Vec<u8>,
    deadline: Timestamp,
}

impl StoreRecord {
    fn is_stale(&self, now: Timestamp) -> bool {
        self.deadline <= now
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    /// Creates a new (empty) in-memory session store.
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Delete expired records from the store.
    ///
    /// If `batch_size` is provided, at most `batch_size` records are removed.
    /// It returns the number of records that were removed.
    #[tracing::instrument(name = "Delete expired records", level = tracing::Level::TRACE, skip_all)]
    pub async fn delete_expired(&self, batch_size: Option<NonZeroUsize>) -> usize {
        let mut guard = self.0.lock().await;
        let now = Timestamp::now();
        let mut stale_keys = Vec::new();
        for (key, record) in guard.iter() {
            if record.is_stale(now) {
                stale_keys.push(key.clone());
                if let Some(batch_size) = batch_size {
                    if stale_keys.len() >= batch_size.get() {
                        break;
                    }
                }
            }
        }
        let num_deleted = stale_keys.len();
        for key in stale_keys {
            guard.remove(&key);
        }
        num_deleted
    }

    /// The number of records held in memory, including stale ones
    /// that haven't been swept yet.
    pub async fn len(&self) -> usize {
        self.0.lock().await.len()
    }

    /// `true` if the store holds no records, stale or otherwise.
    pub async fn is_empty(&self) -> bool {
        self.0.lock().await.is_empty()
    }
}

fn deadline(ttl: Duration) -> Timestamp {
    Timestamp::now().checked_add(ttl).unwrap_or(Timestamp::MAX)
}

#[async_trait::async_trait]
impl SessionStorageBackend for InMemorySessionStore {
    /// Retrieves the record stored under `key`, unless it expired.
    #[tracing::instrument(name = "Get session record", level = tracing::Level::TRACE, skip_all)]
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GetError> {
        let guard = self.0.lock().await;
        let outcome = guard
            .get(key)
            .filter(|record| !record.is_stale(Timestamp::now()))
            .map(|record| record.value.clone());
        Ok(outcome)
    }

    /// Stores a record under `key`, overwriting whatever was there.
    #[tracing::instrument(name = "Set session record", level = tracing::Level::TRACE, skip_all)]
    async fn set(&self, key: &[u8], value: &[u8], ttl: Duration) -> Result<(), SetError> {
        let mut guard = self.0.lock().await;
        guard.insert(
            key.to_owned(),
            StoreRecord {
                value: value.to_owned(),
                deadline: deadline(ttl),
            },
        );
        Ok(())
    }

    /// Removes the record stored under `key`, if any.
    #[tracing::instrument(name = "Delete session record", level = tracing::Level::TRACE, skip_all)]
    async fn delete(&self, key: &[u8]) -> Result<(), DeleteError> {
        let mut guard = self.0.lock().await;
        guard.remove(key);
        Ok(())
    }
}
