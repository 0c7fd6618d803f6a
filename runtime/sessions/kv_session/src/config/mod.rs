//! Types related to [`SessionConfig`][crate::SessionConfig].
mod codec;
mod options;

pub use codec::CodecConfig;
pub use options::SessionOptions;
