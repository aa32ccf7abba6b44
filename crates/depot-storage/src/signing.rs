//! HMAC signatures for links and node-to-node requests.
//!
//! Signature format: `base64url(HMAC-SHA256(secret, "{path}:{expires}")):{expires}`,
//! where `expires` is a unix timestamp in seconds and `0` means the signature
//! never expires.

use crate::traits::{StorageError, StorageResult};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Signs and verifies paths with a shared secret.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign `path` so the signature is valid for `ttl`, or forever when `ttl` is `None`.
    pub fn sign_for(&self, path: &str, ttl: Option<Duration>) -> StorageResult<String> {
        let expires = match ttl {
            Some(ttl) => now_secs().saturating_add(ttl.as_secs()),
            None => 0,
        };
        self.sign(path, expires)
    }

    /// Sign `path` with an absolute expiry timestamp.
    pub fn sign(&self, path: &str, expires: u64) -> StorageResult<String> {
        let mut mac = self.mac()?;
        mac.update(format!("{}:{}", path, expires).as_bytes());
        let tag = mac.finalize().into_bytes();

        Ok(format!(
            "{}:{}",
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(tag),
            expires
        ))
    }

    /// Verify a signature produced by [`UrlSigner::sign`] for `path`.
    pub fn verify(&self, path: &str, sign: &str) -> StorageResult<()> {
        let (encoded, expires) = sign
            .rsplit_once(':')
            .ok_or_else(|| StorageError::SignFailed("Malformed signature".to_string()))?;
        let expires: u64 = expires
            .parse()
            .map_err(|_| StorageError::SignFailed("Malformed signature expiry".to_string()))?;

        if expires != 0 && now_secs() > expires {
            return Err(StorageError::SignFailed("Signature has expired".to_string()));
        }

        let tag = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| StorageError::SignFailed("Malformed signature".to_string()))?;

        let mut mac = self.mac()?;
        mac.update(format!("{}:{}", path, expires).as_bytes());
        mac.verify_slice(&tag)
            .map_err(|_| StorageError::SignFailed("Signature mismatch".to_string()))
    }

    fn mac(&self) -> StorageResult<Hmac<Sha256>> {
        Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| StorageError::ConfigError(format!("Invalid signing key: {}", e)))
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
