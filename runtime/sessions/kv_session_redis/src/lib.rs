//! A session store for `kv_session` backed by Redis, or by a Redis-compatible database (e.g. Valkey).
use kv_session::store::{
    SessionStorageBackend,
    errors::{DeleteError, GetError, SetError},
};
use redis::{AsyncCommands, SetExpiry, SetOptions, Value, aio::ConnectionManager};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[non_exhaustive]
/// Configure [`RedisSessionStore`].
pub struct RedisSessionStoreConfig {
    /// A prefix prepended to every key written by the store, separated by a `:`.
    ///
    /// Use it to share a Redis instance between several applications.
    /// By default, keys are not namespaced.
    #[serde(default)]
    pub namespace: Option<String>,
}

impl RedisSessionStoreConfig {
    /// Set the namespace for the keys written by the store.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

#[derive(Clone)]
/// A session store using Redis as its backend.
///
/// # Implementation details
///
/// Records are written with `SET ... EX`, so Redis takes care of expiring them.
/// They are read with `GET` and removed with `DEL`.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    cfg: RedisSessionStoreConfig,
}

impl std::fmt::Debug for RedisSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionStore")
            .field("conn", &"<ConnectionManager>")
            .field("cfg", &self.cfg)
            .finish()
    }
}

impl RedisSessionStore {
    /// Creates a new Redis session store instance.
    ///
    /// It requires a [`ConnectionManager`] instance to interact with Redis.
    pub fn new(conn: ConnectionManager, cfg: RedisSessionStoreConfig) -> Self {
        Self { conn, cfg }
    }

    fn redis_key(&self, key: &[u8]) -> Vec<u8> {
        namespaced_key(self.cfg.namespace.as_deref(), key)
    }
}

fn namespaced_key(namespace: Option<&str>, key: &[u8]) -> Vec<u8> {
    match namespace {
        Some(namespace) => {
            let mut namespaced = Vec::with_capacity(namespace.len() + 1 + key.len());
            namespaced.extend_from_slice(namespace.as_bytes());
            namespaced.push(b':');
            namespaced.extend_from_slice(key);
            namespaced
        }
        None => key.to_owned(),
    }
}

/// Redis refuses `EX 0`, so sub-second TTLs are rounded up to one second.
fn expiry_secs(ttl: std::time::Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait::async_trait]
impl SessionStorageBackend for RedisSessionStore {
    /// Retrieves the record stored under `key`.
    ///
    /// Redis never returns expired keys, so there's no staleness check to perform here.
    #[tracing::instrument(name = "Get session record", level = tracing::Level::INFO, skip_all)]
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GetError> {
        match self
            .conn
            .clone()
            .get(self.redis_key(key))
            .await
            .map_err(|e| GetError::Other(e.into()))?
        {
            Value::Nil => Ok(None),
            Value::BulkString(raw) => Ok(Some(raw)),
            val => Err(GetError::Other(anyhow::anyhow!(
                "Redis GET replied with {:?}. Expected BulkString or Nil",
                val
            ))),
        }
    }

    /// Stores a record under `key`, overwriting whatever was there.
    #[tracing::instrument(name = "Set session record", level = tracing::Level::INFO, skip_all)]
    async fn set(
        &self,
        key: &[u8],
        value: &[u8],
        ttl: std::time::Duration,
    ) -> Result<(), SetError> {
        match self
            .conn
            .clone()
            .set_options(
                self.redis_key(key),
                value,
                SetOptions::default().with_expiration(SetExpiry::EX(expiry_secs(ttl))),
            )
            .await
            .map_err(|e| SetError::Other(e.into()))?
        {
            Value::Okay => Ok(()),
            Value::Nil => Err(SetError::Rejected),
            val => Err(SetError::Other(anyhow::anyhow!(
                "Redis SET replied with {:?}. Expected Okay or Nil",
                val
            ))),
        }
    }

    /// Removes the record stored under `key`, if any.
    #[tracing::instrument(name = "Delete session record", level = tracing::Level::INFO, skip_all)]
    async fn delete(&self, key: &[u8]) -> Result<(), DeleteError> {
        let ndeleted: u64 = self
            .conn
            .clone()
            .del(self.redis_key(key))
            .await
            .map_err(|e| DeleteError::Other(e.into()))?;

        match ndeleted {
            0 | 1 => Ok(()),
            n => Err(DeleteError::Other(anyhow::anyhow!(
                "Redis DEL replied {:?}. Expected 0 or 1.",
                n
            ))),
        }
    }
}
