//! HMAC-signed, time-limited URLs for stored objects.

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of a signed URL.
pub const SIGNED_URL_TTL_SECS: i64 = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Link has expired")]
    Expired,

    #[error("Invalid signature")]
    Invalid,
}

pub struct UrlSigner {
    /// Keyed MAC, cloned for every signature.
    mac: HmacSha256,
    base_url: String,
}

impl UrlSigner {
    pub fn new(key: &[u8], base_url: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn mac(&self, path: &str, expires: i64, size: Option<u32>) -> HmacSha256 {
        let mut mac = self.mac.clone();
        let size = size.map(|s| s.to_string()).unwrap_or_default();
        mac.update(format!("{}\n{}\n{}", path, expires, size).as_bytes());
        mac
    }

    pub fn signature(&self, path: &str, expires: i64, size: Option<u32>) -> String {
        hex::encode(self.mac(path, expires, size).finalize().into_bytes())
    }

    /// Build a URL for `path` valid until `now + SIGNED_URL_TTL_SECS`.
    pub fn signed_url(&self, path: &str, size: Option<u32>, now: i64) -> String {
        let expires = now + SIGNED_URL_TTL_SECS;
        let signature = self.signature(path, expires, size);
        match size {
            Some(size) => format!(
                "{}/api/storage/{}?expires={}&size={}&signature={}",
                self.base_url, path, expires, size, signature
            ),
            None => format!(
                "{}/api/storage/{}?expires={}&signature={}",
                self.base_url, path, expires, signature
            ),
        }
    }

    pub fn verify(
        &self,
        path: &str,
        expires: i64,
        size: Option<u32>,
        signature: &str,
        now: i64,
    ) -> Result<(), SignatureError> {
        let provided = hex::decode(signature).map_err(|_| SignatureError::Invalid)?;
        self.mac(path, expires, size)
            .verify_slice(&provided)
            .map_err(|_| SignatureError::Invalid)?;
        if expires <= now {
            return Err(SignatureError::Expired);
        }
        Ok(())
    }
}
