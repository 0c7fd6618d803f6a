use std::sync::Arc;

use kv_session::{
    SessionManager, SessionStore,
    codec::{
        CodecChain, SessionCodec,
        errors::{DecodeError, EncodeError},
    },
    config::{CodecConfig, SessionOptions},
    store::{
        SessionStorageBackend,
        errors::{DeleteError, GetError, SetError},
    },
};
use kv_session_memory_store::InMemorySessionStore;
use tokio::sync::Mutex;

/// The name used for sessions throughout the test suite, unless stated otherwise.
pub const SESSION_NAME: &str = "session-name";

pub const HASH_KEY: &[u8] = b"a-hash-key-that-is-at-least-32-bytes-long";
pub const BLOCK_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

/// A codec chain with a single authenticated and encrypted codec.
pub fn codecs() -> CodecChain {
    CodecChain::from_key_pairs(&[HASH_KEY, BLOCK_KEY], &CodecConfig::default()).unwrap()
}

/// A session manager on top of an empty in-memory store, with default options.
pub fn manager() -> SessionManager {
    manager_with_backend(InMemorySessionStore::default())
}

/// A session manager on top of the given backend, with default options.
pub fn manager_with_backend<B>(backend: B) -> SessionManager
where
    B: SessionStorageBackend + 'static,
{
    SessionManager::new(SessionStore::new(backend), codecs(), SessionOptions::default())
}

/// A session manager that stores and sends payloads as they are, without
/// authentication nor encryption, with a mechanism to inspect what calls were made to the store.
pub fn plaintext_spy_manager() -> (SessionManager, CallTracker) {
    let backend = SpyBackend::new(InMemorySessionStore::default());
    let call_tracker = backend.call_tracker();
    let codecs = CodecChain::new(vec![Box::new(PlaintextCodec)]).unwrap();
    let manager = SessionManager::new(SessionStore::new(backend), codecs, SessionOptions::default());
    (manager, call_tracker)
}

/// A session manager on top of an empty in-memory store, with a mechanism to inspect
/// what calls were made to it.
pub fn spy_manager() -> (SessionManager, CallTracker) {
    let backend = SpyBackend::new(InMemorySessionStore::default());
    let call_tracker = backend.call_tracker();
    (manager_with_backend(backend), call_tracker)
}

/// A wrapper that keeps track of which methods have been called
/// on the underlying session storage backend
#[derive(Debug)]
pub struct SpyBackend<B> {
    backend: B,
    call_tracker: CallTracker,
}

impl<B> SpyBackend<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            call_tracker: Default::default(),
        }
    }

    pub fn call_tracker(&self) -> CallTracker {
        self.call_tracker.clone()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CallTracker(Arc<Mutex<Vec<String>>>);

impl CallTracker {
    pub async fn assert_store_was_untouched(&self) {
        let oplog = self.0.lock().await;
        assert!(
            oplog.is_empty(),
            "The store was supposed to be untouched, but at least one method has been called on it. Operation log:\n  - {}",
            oplog.join("\n  - ")
        )
    }

    pub async fn assert_never_written(&self) {
        let oplog = self.0.lock().await;
        assert!(
            !oplog.iter().any(|op| op.starts_with("set") || op.starts_with("delete")),
            "The store was not supposed to be modified. Operation log:\n  - {}",
            oplog.join("\n  - ")
        )
    }

    pub async fn operation_log(&self) -> Vec<String> {
        self.0.lock().await.clone()
    }

    pub async fn reset_operation_log(&self) {
        self.0.lock().await.clear();
    }

    async fn push_operation(&self, op: impl Into<String>) {
        self.0.lock().await.push(op.into());
    }
}

#[async_trait::async_trait]
impl<B: SessionStorageBackend> SessionStorageBackend for SpyBackend<B> {
    async fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, GetError> {
        self.call_tracker
            .push_operation(format!("get {}", String::from_utf8_lossy(key)))
            .await;
        self.backend.get(key).await
    }

    async fn set(
        &self,
        key: &[u8],
        value: &[u8],
        ttl: std::time::Duration,
    ) -> Result<(), SetError> {
        self.call_tracker
            .push_operation(format!(
                "set {} {}",
                String::from_utf8_lossy(key),
                ttl.as_secs()
            ))
            .await;
        self.backend.set(key, value, ttl).await
    }

    async fn delete(&self, key: &[u8]) -> Result<(), DeleteError> {
        self.call_tracker
            .push_operation(format!("delete {}", String::from_utf8_lossy(key)))
            .await;
        self.backend.delete(key).await
    }
}

/// A backend that fails every operation, as an unreachable server would.
#[derive(Debug, Default)]
pub struct FailingBackend;

#[async_trait::async_trait]
impl SessionStorageBackend for FailingBackend {
    async fn get(&self, _key: &[u8]) -> Result<Option<Vec<u8>>, GetError> {
        Err(GetError::Other(anyhow::anyhow!("Connection refused")))
    }

    async fn set(
        &self,
        _key: &[u8],
        _value: &[u8],
        _ttl: std::time::Duration,
    ) -> Result<(), SetError> {
        Err(SetError::Other(anyhow::anyhow!("Connection refused")))
    }

    async fn delete(&self, _key: &[u8]) -> Result<(), DeleteError> {
        Err(DeleteError::Other(anyhow::anyhow!("Connection refused")))
    }
}

/// A codec that leaves payloads untouched.
#[derive(Debug)]
pub struct PlaintextCodec;

impl SessionCodec for PlaintextCodec {
    fn encode(&self, _name: &str, payload: &[u8]) -> Result<String, EncodeError> {
        String::from_utf8(payload.to_owned()).map_err(|e| EncodeError::Other(e.into()))
    }

    fn decode(&self, _name: &str, token: &str) -> Result<Vec<u8>, DecodeError> {
        Ok(token.as_bytes().to_owned())
    }
}
