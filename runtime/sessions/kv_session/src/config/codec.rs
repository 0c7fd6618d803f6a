#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure the limits enforced by [`SecureCookieCodec`].
///
/// [`SecureCookieCodec`]: crate::codec::SecureCookieCodec
pub struct CodecConfig {
    /// The maximum length, in bytes, of an encoded token.
    ///
    /// Encoding a payload whose token would exceed this limit fails, and so
    /// does decoding a token that exceeds it.
    /// Set it to `0` to disable the check.
    ///
    /// # Default
    ///
    /// 4096 bytes, the smallest cookie size limit browsers are required to support.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// How old a token can be before it's rejected on decode.
    ///
    /// The check relies on the timestamp embedded (and authenticated) in every token,
    /// and it's independent of the expiration enforced by the storage backend.
    /// Set it to zero to disable the check.
    ///
    /// # Default
    ///
    /// 30 days.
    #[serde(with = "humantime_serde", default = "default_max_age")]
    pub max_age: std::time::Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            max_age: default_max_age(),
        }
    }
}

fn default_max_length() -> usize {
    4096
}

fn default_max_age() -> std::time::Duration {
    std::time::Duration::from_secs(60 * 60 * 24 * 30)
}
