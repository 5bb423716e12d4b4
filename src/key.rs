use std::fmt;

use aes_gcm::aead::{
    OsRng,
    rand_core::{CryptoRng, RngCore},
};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Length of generated hash keys.
pub const HASH_KEY_LEN: usize = 64;
/// Length of generated block keys (AES-256).
pub const BLOCK_KEY_LEN: usize = 32;

const MIN_HASH_KEY_LEN: usize = 32;

/// The hash (HMAC) key and block (AES-GCM) key used by [`SecureCookie`](crate::SecureCookie).
///
/// Both keys are wiped from memory on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct KeyMaterial {
    hash_key: Zeroizing<Vec<u8>>,
    block_key: Zeroizing<Vec<u8>>,
}

impl KeyMaterial {
    /// Wraps caller-supplied keys.
    ///
    /// The hash key must be at least 32 bytes. The block key must be 16, 24 or 32 bytes,
    /// selecting AES-128, AES-192 or AES-256.
    pub fn new(hash_key: impl Into<Vec<u8>>, block_key: impl Into<Vec<u8>>) -> Result<Self> {
        let hash_key = Zeroizing::new(hash_key.into());
        let block_key = Zeroizing::new(block_key.into());

        if hash_key.len() < MIN_HASH_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "hash key must be at least {MIN_HASH_KEY_LEN} bytes, got {}",
                hash_key.len()
            )));
        }
        if !matches!(block_key.len(), 16 | 24 | 32) {
            return Err(Error::InvalidKey(format!(
                "block key must be 16, 24 or 32 bytes, got {}",
                block_key.len()
            )));
        }

        Ok(Self {
            hash_key,
            block_key,
        })
    }

    /// Generates fresh keys from the operating system's CSPRNG.
    pub fn generate() -> Result<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generates fresh keys from the given random source.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self> {
        let mut hash_key = Zeroizing::new(vec![0u8; HASH_KEY_LEN]);
        let mut block_key = Zeroizing::new(vec![0u8; BLOCK_KEY_LEN]);

        rng.try_fill_bytes(&mut hash_key)
            .and_then(|()| rng.try_fill_bytes(&mut block_key))
            .map_err(|err| Error::KeyGeneration(err.to_string()))?;

        Ok(Self {
            hash_key,
            block_key,
        })
    }

    pub(crate) fn hash_key(&self) -> &[u8] {
        &self.hash_key
    }

    pub(crate) fn block_key(&self) -> &[u8] {
        &self.block_key
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("hash_key", &format_args!("[redacted; {}]", self.hash_key.len()))
            .field("block_key", &format_args!("[redacted; {}]", self.block_key.len()))
            .finish()
    }
}
