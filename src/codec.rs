//! The secure cookie token format.
//!
//! A token is `b64url(body "|" mac)`, where `body` is `timestamp|max_age|value`, `value` is the
//! base64url of `nonce || AES-GCM(payload)` with the cookie name as associated data, and `mac` is
//! HMAC-SHA256 over `name|body`.
//!
//! Note: the layout is an implementation detail and may evolve.

use std::{fmt::Debug, iter, sync::Arc};

use aes_gcm::{
    Aes128Gcm, Aes256Gcm, AesGcm,
    aead::{self, Aead, KeyInit, OsRng, consts::U12, rand_core::RngCore},
    aes::Aes192,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::{
    Payload,
    error::{Error, Result},
    key::KeyMaterial,
};

type HmacSha256 = Hmac<Sha256>;
type Aes192Gcm = AesGcm<Aes192, U12>;

/// Server-side age ceiling applied to every token, in seconds (30 days).
pub const DEFAULT_MAX_AGE_LIMIT: i64 = 86400 * 30;
/// Largest encoded token accepted or produced, in bytes.
pub const DEFAULT_MAX_LENGTH: usize = 4096;

const NONCE_LEN: usize = 12;
const MAC_LEN: usize = 32;

/// An authenticated-encryption backend for cookie values.
///
/// Implementations must bind tokens to `name` and must fail, without saying why, on any token they
/// did not produce for that name or that has outlived `max_age`.
pub trait Codec: Debug + Clone + Send + Sync + 'static {
    fn encode(&self, name: &str, payload: &Payload, max_age: i64) -> Result<String>;
    fn decode(&self, name: &str, token: &str) -> Result<Payload>;
}

/// Why a token was refused. Only ever logged, never returned.
#[derive(Debug, Clone, Copy)]
enum Rejection {
    Name,
    TooLong,
    Encoding,
    Truncated,
    Format,
    Mac,
    Expired,
    Decrypt,
    Payload,
}

/// HMAC-SHA256 plus AES-GCM cookie codec.
#[derive(Debug, Clone)]
pub struct SecureCookie {
    current: Arc<KeyMaterial>,
    previous: Vec<Arc<KeyMaterial>>,
    max_age_limit: i64,
    max_length: usize,
}

impl SecureCookie {
    /// A codec keyed by `keys`, with the default age ceiling and length limit.
    pub fn new(keys: KeyMaterial) -> Self {
        Self {
            current: Arc::new(keys),
            previous: Vec::new(),
            max_age_limit: DEFAULT_MAX_AGE_LIMIT,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Accepts tokens produced under an older key.
    ///
    /// New tokens are always produced with the current key. Previous keys are tried in the order
    /// they were added.
    #[must_use]
    pub fn with_previous_keys(mut self, keys: KeyMaterial) -> Self {
        self.previous.push(Arc::new(keys));
        self
    }

    /// Sets the server-side age ceiling in seconds. Zero disables it.
    #[must_use]
    pub fn with_max_age_limit(mut self, seconds: i64) -> Self {
        self.max_age_limit = seconds;
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Encodes `payload` as if the current time were `now`.
    pub fn encode_at(
        &self,
        name: &str,
        payload: &Payload,
        max_age: i64,
        now: OffsetDateTime,
    ) -> Result<String> {
        if name.is_empty() {
            return Err(Error::InvalidName(name.to_owned()));
        }

        let plaintext =
            serde_json::to_vec(payload).map_err(|err| Error::Encode(err.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|err| Error::Encode(err.to_string()))?;

        let ciphertext = seal(
            self.current.block_key(),
            &nonce,
            name.as_bytes(),
            &plaintext,
        )?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);

        let body = format!(
            "{}|{max_age}|{}",
            now.unix_timestamp(),
            URL_SAFE_NO_PAD.encode(&sealed)
        );
        let tag = mac(self.current.hash_key(), name, body.as_bytes())
            .map_err(|err| Error::Encode(err.to_string()))?
            .finalize()
            .into_bytes();

        let mut raw = body.into_bytes();
        raw.push(b'|');
        raw.extend_from_slice(&tag);

        let token = URL_SAFE_NO_PAD.encode(raw);
        if token.len() > self.max_length {
            return Err(Error::ValueTooLong {
                len: token.len(),
                max: self.max_length,
            });
        }

        Ok(token)
    }

    /// Decodes `token` as if the current time were `now`.
    pub fn decode_at(&self, name: &str, token: &str, now: OffsetDateTime) -> Result<Payload> {
        self.try_decode(name, token, now).map_err(|reason| {
            tracing::debug!(cookie = name, ?reason, "secure cookie rejected");
            Error::Decode
        })
    }

    fn try_decode(
        &self,
        name: &str,
        token: &str,
        now: OffsetDateTime,
    ) -> std::result::Result<Payload, Rejection> {
        if name.is_empty() {
            return Err(Rejection::Name);
        }
        if token.len() > self.max_length {
            return Err(Rejection::TooLong);
        }

        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| Rejection::Encoding)?;
        if raw.len() <= MAC_LEN {
            return Err(Rejection::Truncated);
        }
        let (body, tail) = raw.split_at(raw.len() - MAC_LEN - 1);
        let (separator, tag) = tail.split_at(1);
        if separator != b"|" {
            return Err(Rejection::Format);
        }

        let keys = self.verify(name, body, tag)?;

        let body = std::str::from_utf8(body).map_err(|_| Rejection::Format)?;
        let mut parts = body.splitn(3, '|');
        let (Some(issued), Some(max_age), Some(value)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Rejection::Format);
        };
        let issued: i64 = issued.parse().map_err(|_| Rejection::Format)?;
        let max_age: i64 = max_age.parse().map_err(|_| Rejection::Format)?;

        if self.is_expired(issued, max_age, now) {
            return Err(Rejection::Expired);
        }

        let sealed = URL_SAFE_NO_PAD
            .decode(value)
            .map_err(|_| Rejection::Encoding)?;
        if sealed.len() < NONCE_LEN {
            return Err(Rejection::Truncated);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = open(keys.block_key(), nonce, name.as_bytes(), ciphertext)
            .map_err(|_| Rejection::Decrypt)?;

        serde_json::from_slice(&plaintext).map_err(|_| Rejection::Payload)
    }

    /// Returns the key set whose hash key authenticates `body`.
    fn verify(
        &self,
        name: &str,
        body: &[u8],
        tag: &[u8],
    ) -> std::result::Result<&KeyMaterial, Rejection> {
        iter::once(&self.current)
            .chain(&self.previous)
            .find(|keys| {
                mac(keys.hash_key(), name, body)
                    .is_ok_and(|hmac| hmac.verify_slice(tag).is_ok())
            })
            .map(|keys| &**keys)
            .ok_or(Rejection::Mac)
    }

    fn is_expired(&self, issued: i64, max_age: i64, now: OffsetDateTime) -> bool {
        let age = now.unix_timestamp().saturating_sub(issued);

        max_age < 0
            || (max_age > 0 && age >= max_age)
            || (self.max_age_limit > 0 && age >= self.max_age_limit)
    }
}

impl Codec for SecureCookie {
    fn encode(&self, name: &str, payload: &Payload, max_age: i64) -> Result<String> {
        self.encode_at(name, payload, max_age, OffsetDateTime::now_utc())
    }

    fn decode(&self, name: &str, token: &str) -> Result<Payload> {
        self.decode_at(name, token, OffsetDateTime::now_utc())
    }
}

fn mac(
    hash_key: &[u8],
    name: &str,
    body: &[u8],
) -> std::result::Result<HmacSha256, hmac::digest::InvalidLength> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(hash_key)?;
    mac.update(name.as_bytes());
    mac.update(b"|");
    mac.update(body);
    Ok(mac)
}

fn seal(block_key: &[u8], nonce: &[u8], aad: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
    let payload = aead::Payload { msg, aad };
    let sealed = match block_key.len() {
        16 => seal_with::<Aes128Gcm>(block_key, nonce, payload),
        24 => seal_with::<Aes192Gcm>(block_key, nonce, payload),
        32 => seal_with::<Aes256Gcm>(block_key, nonce, payload),
        len => {
            return Err(Error::Encode(format!(
                "unsupported block key length {len}"
            )));
        }
    };

    sealed.map_err(|err| Error::Encode(err.to_string()))
}

fn open(
    block_key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    msg: &[u8],
) -> std::result::Result<Vec<u8>, aead::Error> {
    let payload = aead::Payload { msg, aad };
    match block_key.len() {
        16 => open_with::<Aes128Gcm>(block_key, nonce, payload),
        24 => open_with::<Aes192Gcm>(block_key, nonce, payload),
        32 => open_with::<Aes256Gcm>(block_key, nonce, payload),
        _ => Err(aead::Error),
    }
}

fn seal_with<A: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    payload: aead::Payload<'_, '_>,
) -> std::result::Result<Vec<u8>, aead::Error> {
    let cipher = A::new_from_slice(key).map_err(|_| aead::Error)?;
    cipher.encrypt(aead::Nonce::<A>::from_slice(nonce), payload)
}

fn open_with<A: Aead + KeyInit>(
    key: &[u8],
    nonce: &[u8],
    payload: aead::Payload<'_, '_>,
) -> std::result::Result<Vec<u8>, aead::Error> {
    let cipher = A::new_from_slice(key).map_err(|_| aead::Error)?;
    cipher.decrypt(aead::Nonce::<A>::from_slice(nonce), payload)
}
