use biscotti::{RemovalCookie, RequestCookies, ResponseCookie};
use serde_json::Value;
use std::collections::HashMap;
use tracing_log_error::log_error;

use crate::codec::CodecChain;
use crate::codec::errors::{DecodeError, InvalidKeyError};
use crate::config::SessionOptions;
use crate::store::session_key;
use crate::{Session, SessionConfig, SessionId, SessionStore};
use errors::{LoadError, SaveError};

/// Create, load, save and delete sessions.
///
/// The manager ties together a [`SessionStore`], where session records live,
/// and a [`CodecChain`], which authenticates (and optionally encrypts) both
/// the records and the session cookie.
///
/// It holds no per-request state: share a single instance across all
/// concurrent requests.
#[derive(Debug)]
pub struct SessionManager {
    store: SessionStore,
    codecs: CodecChain,
    options: SessionOptions,
}

impl SessionManager {
    /// Create a new session manager.
    ///
    /// `options` is the template every new session is created from.
    pub fn new(store: SessionStore, codecs: CodecChain, options: SessionOptions) -> Self {
        Self {
            store,
            codecs,
            options,
        }
    }

    /// Create a new session manager from a [`SessionConfig`] and a set of key pairs.
    ///
    /// Check out [`CodecChain::from_key_pairs`] for how `keys` are interpreted.
    pub fn from_config(
        store: SessionStore,
        keys: &[&[u8]],
        config: &SessionConfig,
    ) -> Result<Self, InvalidKeyError> {
        let codecs = CodecChain::from_key_pairs(keys, &config.codec)?;
        Ok(Self::new(store, codecs, config.options.clone()))
    }

    /// The options that new sessions start from.
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Change the options that new sessions start from.
    ///
    /// Sessions that have already been created keep their own copy and are not affected.
    pub fn options_mut(&mut self) -> &mut SessionOptions {
        &mut self.options
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The codecs used to encode session records and cookies.
    pub fn codecs(&self) -> &CodecChain {
        &self.codecs
    }

    /// Retrieve the session named `name`, using the value of its cookie, if any.
    ///
    /// If `cookie` decodes to a valid identifier and the store holds a valid
    /// record for it, the session is loaded and [`Session::is_new`] returns `false`.
    /// In every other case—no cookie, a tampered or expired cookie, a missing
    /// record, a record that fails to decode, a store failure—you get a brand-new,
    /// empty session.
    ///
    /// # Error handling
    ///
    /// This method never fails. Unlike [`SessionManager::load`], which reports
    /// every failure to the caller, errors encountered here are logged and
    /// then discarded: an invalid session must degrade to a new session, never
    /// to a failed request.
    /// Decoding failures are logged at `WARN` level, store failures at `ERROR`
    /// level.
    ///
    /// Every call performs its own lookup. Use a [`SessionRegistry`] to avoid
    /// decoding the same session more than once per request.
    ///
    /// [`SessionRegistry`]: crate::SessionRegistry
    pub async fn new_session(&self, name: impl Into<String>, cookie: Option<&str>) -> Session {
        let mut session = Session::fresh(name.into(), self.options.clone());
        let Some(cookie) = cookie else {
            return session;
        };

        let id = match self.codecs.decode::<String>(session.name(), cookie) {
            Ok(id) => id,
            Err(e) => {
                log_error!(
                    e,
                    level: tracing::Level::WARN,
                    session.name = %session.name(),
                    "Invalid session cookie, creating a new session."
                );
                return session;
            }
        };
        let Some(id) = SessionId::from_existing(id) else {
            tracing::debug!(
                session.name = %session.name(),
                "The session cookie carries an empty identifier, creating a new session."
            );
            return session;
        };

        session.id = Some(id);
        match self.fetch(&session).await {
            Ok(Some(values)) => {
                session.values = values;
                session.is_new = false;
            }
            Ok(None) => {
                tracing::debug!(
                    session.name = %session.name(),
                    "There is no record for the session identifier in the cookie, creating a new session."
                );
                session.id = None;
            }
            Err(e) => {
                if matches!(e, LoadError::Store(_)) {
                    log_error!(
                        e,
                        session.name = %session.name(),
                        "Failed to retrieve the session record, creating a new session."
                    );
                } else {
                    log_error!(
                        e,
                        level: tracing::Level::WARN,
                        session.name = %session.name(),
                        "Failed to decode the session record, creating a new session."
                    );
                }
                session.id = None;
            }
        }
        session
    }

    /// Retrieve the session named `name`, looking for a cookie with the same name
    /// in the incoming request cookies.
    ///
    /// Check out [`SessionManager::new_session`] for the details.
    pub async fn from_request_cookies(
        &self,
        name: &str,
        request_cookies: &RequestCookies<'_>,
    ) -> Session {
        let cookie = request_cookies.get(name);
        let value = cookie.as_ref().map(|c| c.value());
        self.new_session(name, value).await
    }

    /// Load the values of `session` from the store.
    ///
    /// If the session has no identifier, or if the store has no record for it,
    /// the session is left untouched: that's a cache miss, not a failure.
    /// If the record is found, its values replace the ones held by `session`
    /// and the session is no longer [new][Session::is_new].
    ///
    /// Store and decoding failures are returned to the caller, leaving
    /// `session` untouched.
    #[tracing::instrument(name = "Load session", level = tracing::Level::DEBUG, skip_all, fields(session.name = %session.name()))]
    pub async fn load(&self, session: &mut Session) -> Result<(), LoadError> {
        if let Some(values) = self.fetch(session).await? {
            session.values = values;
            session.is_new = false;
        }
        Ok(())
    }

    async fn fetch(&self, session: &Session) -> Result<Option<HashMap<String, Value>>, LoadError> {
        let Some(id) = &session.id else {
            return Ok(None);
        };
        let Some(raw) = self.store.get(&session_key(id)).await? else {
            return Ok(None);
        };
        let token = std::str::from_utf8(&raw).map_err(|_| DecodeError::Malformed)?;
        let values = self.codecs.decode(session.name(), token)?;
        Ok(Some(values))
    }

    /// Persist `session`, or delete it, and return the cookie to attach to the response.
    ///
    /// # Deletion
    ///
    /// If [`SessionOptions::max_age`] is zero or less, the session record is
    /// removed from the store and a removal cookie is returned, whether the
    /// record existed or not.
    ///
    /// # Persistence
    ///
    /// Otherwise, the session is assigned a random identifier (if it doesn't
    /// have one yet), its values are encoded and written to the store with a
    /// time-to-live of `max_age` seconds. The returned cookie carries the
    /// encoded identifier—never the values.
    ///
    /// # Errors
    ///
    /// Encoding happens before the store is touched: if it fails, the store
    /// is left unchanged. Store failures are returned as they are, without retries.
    /// No cookie should be sent to the client if this method fails.
    #[tracing::instrument(name = "Save session", level = tracing::Level::DEBUG, skip_all, fields(session.name = %session.name()))]
    pub async fn save(&self, session: &mut Session) -> Result<ResponseCookie<'static>, SaveError> {
        if session.options.is_deletion() {
            match &session.id {
                Some(id) => self.store.delete(&session_key(id)).await?,
                None => tracing::trace!(
                    "The session was marked for deletion, but it was never persisted. This is a no-op."
                ),
            }
            return Ok(removal_cookie(session.name(), &session.options));
        }

        let id = match &session.id {
            Some(id) => id.clone(),
            None => {
                let id = SessionId::random()?;
                session.id = Some(id.clone());
                id
            }
        };
        let record = self.codecs.encode(session.name(), &session.values)?;
        let token = self.codecs.encode(session.name(), id.as_str())?;
        let ttl = std::time::Duration::from_secs(session.options.max_age.unsigned_abs());
        self.store
            .set(&session_key(&id), record.as_bytes(), ttl)
            .await?;

        Ok(session_cookie(session.name(), token, &session.options))
    }
}

fn session_cookie(name: &str, value: String, options: &SessionOptions) -> ResponseCookie<'static> {
    let mut cookie = ResponseCookie::new(name.to_owned(), value);
    if let Some(domain) = options.domain.as_deref() {
        cookie = cookie.set_domain(domain.to_owned());
    }
    if let Some(path) = options.path.as_deref() {
        cookie = cookie.set_path(path.to_owned());
    }
    if let Some(same_site) = options.same_site {
        cookie = cookie.set_same_site(same_site);
    }
    if options.secure {
        cookie = cookie.set_secure(true);
    }
    if options.http_only {
        cookie = cookie.set_http_only(true);
    }
    cookie.set_max_age(time::Duration::seconds(options.max_age))
}

fn removal_cookie(name: &str, options: &SessionOptions) -> ResponseCookie<'static> {
    let mut cookie = RemovalCookie::new(name.to_owned());
    if let Some(domain) = options.domain.as_deref() {
        cookie = cookie.set_domain(domain.to_owned());
    }
    if let Some(path) = options.path.as_deref() {
        cookie = cookie.set_path(path.to_owned());
    }
    let cookie: ResponseCookie<'static> = cookie.into();
    cookie.set_max_age(time::Duration::ZERO)
}

/// Errors that can occur when loading or saving a session.
pub mod errors {
    use crate::codec::errors::{DecodeError, EncodeError};
    use crate::id::GenerateIdError;
    use crate::store::errors::{DeleteError, GetError, SetError};

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// The error returned by [`SessionManager::load`][super::SessionManager::load].
    pub enum LoadError {
        #[error("Failed to retrieve the session record from the store")]
        Store(#[from] GetError),
        #[error("Failed to decode the session record")]
        Decode(#[from] DecodeError),
    }

    #[derive(Debug, thiserror::Error)]
    #[non_exhaustive]
    /// The error returned by [`SessionManager::save`][super::SessionManager::save].
    pub enum SaveError {
        #[error("Failed to generate a new session identifier")]
        IdGeneration(#[from] GenerateIdError),
        #[error("Failed to encode the session")]
        Encode(#[from] EncodeError),
        #[error("Failed to store the session record")]
        Store(#[from] SetError),
        #[error("Failed to delete the session record")]
        Delete(#[from] DeleteError),
    }
}
