use crate::SessionId;
use errors::{DeleteError, GetError, SetError};

/// The prefix prepended to the identifier of every session record.
///
/// It sets session records apart from any other data living in the same
/// key-value backend.
pub const SESSION_KEY_PREFIX: &str = "session::";

/// The storage key for the record of the session identified by `id`.
pub fn session_key(id: &SessionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(SESSION_KEY_PREFIX.len() + id.as_str().len());
    key.extend_from_slice(SESSION_KEY_PREFIX.as_bytes());
    key.extend_from_slice(id.as_str().as_bytes());
    key
}

/// Where session records are stored.
///
/// It is a thin wrapper
/// [around your chosen storage backend implementation][`SessionStorageBackend`],
/// removing the need to specify the concrete type of the storage backend
/// everywhere in your code.
#[derive(Debug)]
pub struct SessionStore(Box<dyn SessionStorageBackend>);

impl SessionStore {
    /// Creates a new session store using the provided backend.
    pub fn new<Backend>(backend: Backend) -> Self
    where
        Backend: SessionStorageBackend + 'static,
    {
        Self(Box::new(backend))
    }

    /// Retrieves the raw value stored under `key`.
    ///
    /// It returns `None` if there is no value for `key`, or if it expired.
    pub async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GetError> {
        self.0.get(key).await
    }

    /// Stores `value` under `key`, overwriting whatever was there.
    ///
    /// The backend discards the value once `ttl` has elapsed.
    pub async fn set(
        &self,
        key: &[u8],
        value: &[u8],
        ttl: std::time::Duration,
    ) -> Result<(), SetError> {
        self.0.set(key, value, ttl).await
    }

    /// Removes the value stored under `key`, if any.
    pub async fn delete(&self, key: &[u8]) -> Result<(), DeleteError> {
        self.0.delete(key).await
    }
}

#[async_trait::async_trait]
/// The interface of a key-value storage backend for session records.
///
/// Implementations must be safe to share across concurrent requests:
/// the session manager never locks nor buffers calls to the backend.
pub trait SessionStorageBackend: std::fmt::Debug + Send + Sync {
    /// Retrieves the raw value stored under `key`.
    ///
    /// It must return `Ok(None)` if there is no value for `key` or if the value
    /// expired—a missing key is not an error.
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GetError>;

    /// Stores `value` under `key`, overwriting whatever was there.
    ///
    /// The value must be discarded once `ttl` has elapsed.
    async fn set(&self, key: &[u8], value: &[u8], ttl: std::time::Duration)
        -> Result<(), SetError>;

    /// Removes the value stored under `key`.
    ///
    /// Removing a key that doesn't exist is not an error.
    async fn delete(&self, key: &[u8]) -> Result<(), DeleteError>;
}

/// Errors that can occur when interacting with a session storage backend.
pub mod errors {
    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::get`][super::SessionStorageBackend::get].
    pub enum GetError {
        /// Something went wrong when retrieving the session record.
        #[error("Something went wrong when retrieving the session record.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::set`][super::SessionStorageBackend::set].
    pub enum SetError {
        /// The backend processed the request, but it refused to store the record.
        #[error("The storage backend refused to store the session record.")]
        Rejected,
        /// Something else went wrong when storing the session record.
        #[error("Something went wrong when storing the session record.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionStorageBackend::delete`][super::SessionStorageBackend::delete].
    pub enum DeleteError {
        /// The backend processed the request, but it reported that the deletion failed.
        #[error("The storage backend failed to delete the session record.")]
        Rejected,
        /// Something else went wrong when deleting the session record.
        #[error("Something went wrong when deleting the session record.")]
        Other(#[source] anyhow::Error),
    }
}
