use thiserror::Error;

/// Errors produced while building, encoding or decoding secure cookies.
///
/// Every decode-side failure collapses into [`Error::Decode`], so callers (and clients) cannot
/// tell a forged token from an expired one.
#[derive(Debug, Error)]
pub enum Error {
    /// Cookie name is empty or contains characters outside the cookie-name token set.
    #[error("invalid cookie name: {0:?}")]
    InvalidName(String),

    /// Hash or block key has an unusable length.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The random source could not produce key material.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Payload serialization or encryption failed.
    #[error("failed to encode cookie value: {0}")]
    Encode(String),

    /// The encoded token would not fit in a cookie.
    #[error("encoded cookie value exceeds max length ({len} > {max})")]
    ValueTooLong { len: usize, max: usize },

    /// The token was tampered with, expired, or produced under another name or key.
    #[error("failed to decode cookie value")]
    Decode,

    /// The cookie could not be turned into a header value.
    #[error("invalid cookie header: {0}")]
    Header(String),
}

pub type Result<T> = std::result::Result<T, Error>;
