use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::{SecureRandom, SystemRandom};

/// The number of random bytes behind a freshly generated [`SessionId`].
const ID_ENTROPY_BYTES: usize = 32;

#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
/// The identifier for a session.
///
/// It names the storage key of the session record, and it's the only
/// information carried (encoded) by the session cookie.
///
/// # Format stability
///
/// From an API perspective, a session id is an opaque, cookie-safe string.
/// Do **not** depend on the specifics of the underlying representation.
/// It may change between versions and those changes will not be considered
/// breaking changes.
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random identifier using the random number generator
    /// provided by the underlying operating system.
    ///
    /// The identifier is built from 32 random bytes, encoded using the URL-safe
    /// base64 alphabet without padding.
    pub fn random() -> Result<Self, GenerateIdError> {
        let mut bytes = [0u8; ID_ENTROPY_BYTES];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| GenerateIdError)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Wrap an identifier that was previously issued by [`SessionId::random`].
    ///
    /// It returns `None` if `id` is empty: an empty identifier never refers
    /// to a persisted session.
    pub fn from_existing(id: String) -> Option<Self> {
        if id.is_empty() { None } else { Some(Self(id)) }
    }

    /// The textual representation of the identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("The operating system failed to provide enough randomness to generate a session id")]
/// The error returned by [`SessionId::random`].
pub struct GenerateIdError;
