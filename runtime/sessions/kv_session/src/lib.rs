/*!
HTTP sessions persisted in a key-value store.

# Why do we need sessions?

HTTP is stateless: every request stands on its own. Sessions allow the server to attach
state to a set of requests coming from the same client—e.g. to remember that a user has
already logged in. They are built on top of cookies: the server sets a cookie in the HTTP
response (`Set-Cookie` header), the client stores it and sends it back with every
subsequent request (`Cookie` header).

# How it works

All session values live on the server, inside a **session storage backend**—Redis, an
in-memory map, or anything that can [get, set with an expiration, and delete raw
bytes][store::SessionStorageBackend].
Each session is stored under a key derived from its identifier (`session::<id>`).

The session cookie carries nothing but the identifier, encoded by a
[codec][codec::SessionCodec] that authenticates it (HMAC-SHA256) and, optionally,
encrypts it (AES-GCM). A tampered cookie, or a cookie issued for a different session
name, is rejected and the client gets a brand-new session.

The [`SessionManager`] ties the two together:

- [`SessionManager::new_session`] turns the incoming cookie into a [`Session`];
- [`SessionManager::save`] persists the session values and gives you back the cookie
  to attach to the response;
- setting [`max_age`][config::SessionOptions::max_age] to zero (or less) before saving
  deletes the session, both from the store and from the client.

Use a [`SessionRegistry`] to look up the same session more than once per request
without hitting the store again.

## References

Further reading on sessions:
- [RFC 6265](https://datatracker.ietf.org/doc/html/rfc6265);
- [OWASP's session management cheat-sheet](https://cheatsheetseries.owasp.org/cheatsheets/Session_Management_Cheat_Sheet.html).
*/
pub mod codec;
pub mod config;
pub mod cookies;
mod id;
mod manager;
mod middleware;
mod registry;
mod session_;
mod store_;

pub use id::SessionId;
pub use manager::SessionManager;
pub use middleware::finalize_session;
pub use registry::SessionRegistry;
pub use session_::Session;
pub use store_::SessionStore;

pub mod store {
    //! Types and traits related to [`SessionStore`][super::SessionStore].
    pub use crate::store_::errors;
    pub use crate::store_::{SESSION_KEY_PREFIX, SessionStorageBackend, session_key};
}

pub mod state {
    //! Errors that can occur when manipulating a session, or its values.
    pub mod errors {
        pub use crate::id::GenerateIdError;
        pub use crate::manager::errors::{LoadError, SaveError};
        pub use crate::session_::errors::{ValueDeserializationError, ValueSerializationError};
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure how sessions are managed.
///
/// An empty configuration is valid: every field has a default.
/// The default cookie attributes follow
/// [OWASP's guidelines for secure session management](https://github.com/OWASP/ASVS/blob/67726f1976a759c58a82669d0dad3b16b9c04ecc/4.0/en/0x12-V3-Session-management.md).
pub struct SessionConfig {
    #[serde(default)]
    /// The options every new session starts from.
    pub options: crate::config::SessionOptions,
    #[serde(default)]
    /// Configure the limits enforced by the session codecs.
    pub codec: crate::config::CodecConfig,
}
