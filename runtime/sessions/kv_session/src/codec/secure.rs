use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::aead::{AES_128_GCM, AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::digest::SHA256_OUTPUT_LEN;
use ring::hmac;
use ring::rand::{SecureRandom, SystemRandom};

use super::SessionCodec;
use super::errors::{DecodeError, EncodeError, InvalidKeyError};
use crate::config::CodecConfig;

/// How far in the future a token timestamp can be before it's rejected.
/// It absorbs clock drift between servers sharing the same keys.
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// A [`SessionCodec`] that authenticates payloads with HMAC-SHA256 and,
/// optionally, encrypts them with AES-GCM.
///
/// # Token format
///
/// A token is the URL-safe base64 encoding (no padding) of
/// `{timestamp}|{body}|{mac}`, where:
///
/// - `timestamp` is the creation time, in seconds since the Unix epoch;
/// - `body` is the payload in URL-safe base64. If an encryption key is set,
///   the payload is encrypted first, with the session name as additional
///   authenticated data and a random nonce prepended to the ciphertext;
/// - `mac` authenticates `{name}|{timestamp}|{body}`, binding the token to the
///   session name it was issued for.
///
/// The token is authenticated before anything else is done with it: a
/// tampered token is rejected without ever touching the decryption routine.
pub struct SecureCookieCodec {
    hash_key: hmac::Key,
    block_key: Option<LessSafeKey>,
    rng: SystemRandom,
    max_length: usize,
    max_age: std::time::Duration,
}

impl std::fmt::Debug for SecureCookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureCookieCodec")
            .field("encrypted", &self.block_key.is_some())
            .field("max_length", &self.max_length)
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl SecureCookieCodec {
    /// Create a new codec with the default [`CodecConfig`].
    ///
    /// `hash_key` authenticates tokens, it's required and it should be
    /// 32 or 64 bytes long.
    /// `block_key`, if provided, encrypts the payload. It must be either
    /// 16 or 32 bytes long, to select AES-128 or AES-256.
    pub fn new(hash_key: &[u8], block_key: Option<&[u8]>) -> Result<Self, InvalidKeyError> {
        if hash_key.is_empty() {
            return Err(InvalidKeyError::EmptyHashKey);
        }
        let block_key = block_key
            .map(|key| {
                let algorithm = match key.len() {
                    16 => &AES_128_GCM,
                    32 => &AES_256_GCM,
                    n => return Err(InvalidKeyError::BlockKeyLength(n)),
                };
                UnboundKey::new(algorithm, key)
                    .map(LessSafeKey::new)
                    .map_err(|_| InvalidKeyError::BlockKeyLength(key.len()))
            })
            .transpose()?;
        let config = CodecConfig::default();
        Ok(Self {
            hash_key: hmac::Key::new(hmac::HMAC_SHA256, hash_key),
            block_key,
            rng: SystemRandom::new(),
            max_length: config.max_length,
            max_age: config.max_age,
        })
    }

    /// Apply the limits specified in `config`.
    pub fn with_config(mut self, config: &CodecConfig) -> Self {
        self.max_length = config.max_length;
        self.max_age = config.max_age;
        self
    }

    fn encode_at(&self, name: &str, payload: &[u8], now: i64) -> Result<String, EncodeError> {
        let body = match &self.block_key {
            Some(key) => self.seal(key, name, payload)?,
            None => payload.to_vec(),
        };
        let signed = format!("{now}|{}", URL_SAFE_NO_PAD.encode(body));
        let mac = hmac::sign(&self.hash_key, &mac_input(name, signed.as_bytes()));

        let mut raw = signed.into_bytes();
        raw.push(b'|');
        raw.extend_from_slice(mac.as_ref());
        let token = URL_SAFE_NO_PAD.encode(raw);

        if self.max_length != 0 && token.len() > self.max_length {
            return Err(EncodeError::TooLong {
                length: token.len(),
                max_length: self.max_length,
            });
        }
        Ok(token)
    }

    fn decode_at(&self, name: &str, token: &str, now: i64) -> Result<Vec<u8>, DecodeError> {
        if self.max_length != 0 && token.len() > self.max_length {
            return Err(DecodeError::TooLong {
                length: token.len(),
                max_length: self.max_length,
            });
        }
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(DecodeError::Encoding)?;

        // `{timestamp}|{body}` + `|` + mac
        let Some(signed_len) = raw.len().checked_sub(SHA256_OUTPUT_LEN + 1) else {
            return Err(DecodeError::Malformed);
        };
        let (signed, rest) = raw.split_at(signed_len);
        let (separator, mac) = rest.split_at(1);
        if separator != b"|" {
            return Err(DecodeError::Malformed);
        }
        hmac::verify(&self.hash_key, &mac_input(name, signed), mac)
            .map_err(|_| DecodeError::InvalidMac)?;

        let signed = std::str::from_utf8(signed).map_err(|_| DecodeError::Malformed)?;
        let (timestamp, body) = signed.split_once('|').ok_or(DecodeError::Malformed)?;
        let timestamp: i64 = timestamp.parse().map_err(|_| DecodeError::Malformed)?;
        if timestamp > now.saturating_add(MAX_CLOCK_SKEW_SECS) {
            return Err(DecodeError::FromTheFuture);
        }
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);
        if max_age != 0 && timestamp < now.saturating_sub(max_age) {
            return Err(DecodeError::Expired);
        }

        let body = URL_SAFE_NO_PAD
            .decode(body)
            .map_err(DecodeError::Encoding)?;
        match &self.block_key {
            Some(key) => open(key, name, body),
            None => Ok(body),
        }
    }

    /// Encrypt `plaintext`, returning the nonce followed by the ciphertext and its tag.
    fn seal(&self, key: &LessSafeKey, name: &str, plaintext: &[u8]) -> Result<Vec<u8>, EncodeError> {
        let mut nonce = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| EncodeError::Encryption)?;
        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(name.as_bytes()),
            &mut in_out,
        )
        .map_err(|_| EncodeError::Encryption)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&in_out);
        Ok(sealed)
    }
}

impl SessionCodec for SecureCookieCodec {
    fn encode(&self, name: &str, payload: &[u8]) -> Result<String, EncodeError> {
        self.encode_at(name, payload, unix_now())
    }

    fn decode(&self, name: &str, token: &str) -> Result<Vec<u8>, DecodeError> {
        self.decode_at(name, token, unix_now())
    }
}

fn open(key: &LessSafeKey, name: &str, mut sealed: Vec<u8>) -> Result<Vec<u8>, DecodeError> {
    if sealed.len() < NONCE_LEN {
        return Err(DecodeError::Malformed);
    }
    let (nonce, ciphertext) = sealed.split_at_mut(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce).map_err(|_| DecodeError::Malformed)?;
    let plaintext = key
        .open_in_place(nonce, Aad::from(name.as_bytes()), ciphertext)
        .map_err(|_| DecodeError::Decryption)?;
    Ok(plaintext.to_vec())
}

fn mac_input(name: &str, signed: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(name.len() + 1 + signed.len());
    input.extend_from_slice(name.as_bytes());
    input.push(b'|');
    input.extend_from_slice(signed);
    input
}

fn unix_now() -> i64 {
    jiff::Timestamp::now().as_second()
}
