//! Turn session payloads into authenticated (and optionally encrypted) tokens, and back.
//!
//! A [`SessionCodec`] works on raw bytes. [`CodecChain`] sits on top of one or
//! more codecs: it takes care of serialization and it implements key rotation,
//! by encoding with the first codec that succeeds and decoding with the first
//! codec that manages to verify the token.
use errors::{DecodeError, EmptyCodecChainError, EncodeError, InvalidKeyError};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CodecConfig;

mod secure;

pub use secure::SecureCookieCodec;

/// The interface of a session codec.
pub trait SessionCodec: std::fmt::Debug + Send + Sync {
    /// Encode `payload` into an opaque, cookie-safe token.
    ///
    /// `name` is the name of the session the payload belongs to: a token
    /// encoded for one name must not decode under another.
    fn encode(&self, name: &str, payload: &[u8]) -> Result<String, EncodeError>;

    /// Verify `token` and return the payload it was encoded from.
    fn decode(&self, name: &str, token: &str) -> Result<Vec<u8>, DecodeError>;
}

/// An ordered, non-empty collection of [`SessionCodec`]s.
///
/// The first codec is the primary one: it's used to encode, the following
/// ones are only used as fallbacks. Put the current keys first and the
/// retired ones after them to rotate keys without invalidating existing sessions.
#[derive(Debug)]
pub struct CodecChain(Vec<Box<dyn SessionCodec>>);

impl CodecChain {
    /// Build a chain out of the given codecs.
    ///
    /// It fails if `codecs` is empty.
    pub fn new(codecs: Vec<Box<dyn SessionCodec>>) -> Result<Self, EmptyCodecChainError> {
        if codecs.is_empty() {
            return Err(EmptyCodecChainError);
        }
        Ok(Self(codecs))
    }

    /// Build a chain of [`SecureCookieCodec`]s out of a list of keys.
    ///
    /// Keys are grouped in pairs: the first key in a pair is used for
    /// authentication, the second one for encryption.
    /// The encryption key can be left empty, or omitted in the last pair, to
    /// disable encryption for that pair. Authentication keys are mandatory.
    ///
    /// The pairs are tried in order, see [`CodecChain`] for the details.
    pub fn from_key_pairs(keys: &[&[u8]], config: &CodecConfig) -> Result<Self, InvalidKeyError> {
        if keys.is_empty() {
            return Err(InvalidKeyError::NoKeys);
        }
        let mut codecs: Vec<Box<dyn SessionCodec>> = Vec::with_capacity(keys.len().div_ceil(2));
        for pair in keys.chunks(2) {
            let hash_key = pair[0];
            let block_key = pair.get(1).copied().filter(|k| !k.is_empty());
            let codec = SecureCookieCodec::new(hash_key, block_key)?.with_config(config);
            codecs.push(Box::new(codec));
        }
        Ok(Self(codecs))
    }

    /// Serialize `value` as JSON and encode it with the first codec that succeeds.
    ///
    /// If all codecs fail, the error returned by the primary codec is returned.
    pub fn encode<T>(&self, name: &str, value: &T) -> Result<String, EncodeError>
    where
        T: Serialize + ?Sized,
    {
        let payload = serde_json::to_vec(value)?;
        let (primary, fallbacks) = self.split();
        let primary_error = match primary.encode(name, &payload) {
            Ok(token) => return Ok(token),
            Err(e) => e,
        };
        for codec in fallbacks {
            if let Ok(token) = codec.encode(name, &payload) {
                return Ok(token);
            }
        }
        Err(primary_error)
    }

    /// Decode `token` with the first codec that manages to verify it, then
    /// deserialize the payload from JSON.
    ///
    /// If no codec can verify the token, the error returned by the primary
    /// codec is returned.
    pub fn decode<T>(&self, name: &str, token: &str) -> Result<T, DecodeError>
    where
        T: DeserializeOwned,
    {
        let (primary, fallbacks) = self.split();
        let payload = match primary.decode(name, token) {
            Ok(payload) => payload,
            Err(primary_error) => fallbacks
                .iter()
                .enumerate()
                .find_map(|(i, codec)| {
                    let payload = codec.decode(name, token).ok()?;
                    tracing::debug!(
                        session.name = %name,
                        codec.position = i + 1,
                        "The session token was verified by a fallback codec."
                    );
                    Some(payload)
                })
                .ok_or(primary_error)?,
        };
        serde_json::from_slice(&payload).map_err(DecodeError::Deserialization)
    }

    fn split(&self) -> (&dyn SessionCodec, &[Box<dyn SessionCodec>]) {
        match self.0.split_first() {
            Some((primary, fallbacks)) => (&**primary, fallbacks),
            None => unreachable!("A codec chain can't be empty, it's checked on construction."),
        }
    }
}

/// Errors that can occur when encoding or decoding session tokens.
pub mod errors {
    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionCodec::encode`][super::SessionCodec::encode]
    /// and [`CodecChain::encode`][super::CodecChain::encode].
    pub enum EncodeError {
        /// Failed to serialize the session payload.
        #[error("Failed to serialize the session payload.")]
        Serialization(#[from] serde_json::Error),
        /// The encoded token would exceed the configured length limit.
        #[error("The encoded session token is {length} bytes long, exceeding the limit of {max_length} bytes.")]
        TooLong {
            /// The length of the encoded token.
            length: usize,
            /// The configured limit.
            max_length: usize,
        },
        /// Failed to encrypt the session payload.
        #[error("Failed to encrypt the session payload.")]
        Encryption,
        /// Something else went wrong when encoding the session payload.
        #[error("Something went wrong when encoding the session payload.")]
        Other(#[source] anyhow::Error),
    }

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// The error returned by [`SessionCodec::decode`][super::SessionCodec::decode]
    /// and [`CodecChain::decode`][super::CodecChain::decode].
    pub enum DecodeError {
        /// The token exceeds the configured length limit.
        #[error("The session token is {length} bytes long, exceeding the limit of {max_length} bytes.")]
        TooLong {
            /// The length of the token.
            length: usize,
            /// The configured limit.
            max_length: usize,
        },
        /// The token is not valid URL-safe base64.
        #[error("The session token is not valid base64.")]
        Encoding(#[source] base64::DecodeError),
        /// The token doesn't have the expected structure.
        #[error("The session token is malformed.")]
        Malformed,
        /// The token signature doesn't match its content.
        /// It was either tampered with or signed with a different key.
        #[error("The session token failed authentication.")]
        InvalidMac,
        /// The token is older than the configured maximum age.
        #[error("The session token expired.")]
        Expired,
        /// The token is dated in the future.
        #[error("The session token timestamp is in the future.")]
        FromTheFuture,
        /// The token passed authentication, but its payload couldn't be decrypted.
        #[error("Failed to decrypt the session payload.")]
        Decryption,
        /// Failed to deserialize the session payload.
        #[error("Failed to deserialize the session payload.")]
        Deserialization(#[source] serde_json::Error),
        /// Something else went wrong when decoding the session token.
        #[error("Something went wrong when decoding the session token.")]
        Other(#[source] anyhow::Error),
    }

    #[derive(Debug, thiserror::Error)]
    #[error("A codec chain must contain at least one codec.")]
    /// The error returned by [`CodecChain::new`][super::CodecChain::new] when no codec is provided.
    pub struct EmptyCodecChainError;

    #[non_exhaustive]
    #[derive(Debug, thiserror::Error)]
    /// Raised when a key can't be used to build a [`SecureCookieCodec`][super::SecureCookieCodec].
    pub enum InvalidKeyError {
        /// No keys were provided.
        #[error("At least one authentication key is required.")]
        NoKeys,
        /// The authentication key is empty.
        #[error("The authentication key can't be empty.")]
        EmptyHashKey,
        /// The encryption key has an unsupported length.
        #[error("The encryption key must be 16 or 32 bytes long (AES-128 or AES-256), got {0} bytes.")]
        BlockKeyLength(usize),
    }
}
