//! Tracking cookie 编解码
//!
//! ChaCha20-Poly1305 认证加密，cookie 值为
//! `base64url(nonce[12] ‖ tag[16] ‖ ciphertext)`，无填充。
//! 解码失败（篡改、密钥不符、格式错误）一律返回 `None`。

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::TrackingConfig;
use crate::errors::{AffiliateError, Result};

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// cookie 中携带的归因信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingPayload {
    pub ref_code: String,
    pub affiliate_id: Option<String>,
    #[serde(default)]
    pub agency_id: Option<String>,
    pub link_id: String,
    /// 去重命中或未记录点击时为空
    #[serde(default)]
    pub click_id: Option<i64>,
    pub clicked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TrackingPayload {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Clone)]
pub struct CookieCodec {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for CookieCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieCodec").finish_non_exhaustive()
    }
}

impl CookieCodec {
    pub fn new(key: [u8; 32]) -> Self {
        Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        }
    }

    /// 从配置构造
    ///
    /// production 必须提供合法的 `encryption_key`；其他环境可退回到
    /// `SHA-256(fallback_secret)`，两者都没有时使用进程内随机密钥。
    pub fn from_config(tracking: &TrackingConfig, production: bool) -> Result<Self> {
        if let Some(encoded) = tracking.encryption_key.as_deref().filter(|s| !s.is_empty()) {
            return Ok(Self::new(decode_key(encoded)?));
        }

        if production {
            return Err(AffiliateError::configuration(
                "tracking.encryption_key is required in production",
            ));
        }

        match tracking.fallback_secret.as_deref().filter(|s| !s.is_empty()) {
            Some(secret) => {
                warn!("Tracking cookie key derived from fallback_secret (development only)");
                Ok(Self::new(derive_key(secret)))
            }
            None => {
                warn!(
                    "No tracking key configured, using a random key; cookies will not survive restarts"
                );
                Ok(Self::new(rand::random()))
            }
        }
    }

    pub fn encode(&self, payload: &TrackingPayload) -> Result<String> {
        let plaintext = serde_json::to_vec(payload)?;
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        // aead 输出为 ciphertext ‖ tag
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_ref())
            .map_err(|e| AffiliateError::crypto(format!("encrypt tracking cookie: {}", e)))?;
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);

        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(tag);
        out.extend_from_slice(ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(out))
    }

    pub fn decode(&self, token: &str) -> Option<TrackingPayload> {
        let raw = match URL_SAFE_NO_PAD.decode(token.trim()) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("Tracking cookie is not valid base64url: {}", e);
                return None;
            }
        };
        if raw.len() < NONCE_LEN + TAG_LEN {
            debug!("Tracking cookie too short ({} bytes)", raw.len());
            return None;
        }

        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let mut sealed = Vec::with_capacity(rest.len());
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let plaintext = match self.cipher.decrypt(Nonce::from_slice(nonce), sealed.as_ref()) {
            Ok(p) => p,
            Err(_) => {
                debug!("Tracking cookie failed authentication");
                return None;
            }
        };

        serde_json::from_slice(&plaintext)
            .inspect_err(|e| debug!("Tracking cookie payload is not valid JSON: {}", e))
            .ok()
    }
}

/// base64（标准或 url-safe）编码的 32 字节密钥
fn decode_key(encoded: &str) -> Result<[u8; 32]> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim()))
        .map_err(|e| AffiliateError::configuration(format!("invalid tracking.encryption_key: {}", e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        AffiliateError::configuration(format!(
            "tracking.encryption_key must be 32 bytes, got {}",
            b.len()
        ))
    })
}

fn derive_key(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn payload() -> TrackingPayload {
        let now = Utc::now();
        TrackingPayload {
            ref_code: "CODE1234".into(),
            affiliate_id: Some("aff-1".into()),
            agency_id: None,
            link_id: "link-1".into(),
            click_id: Some(42),
            clicked_at: now,
            expires_at: now + Duration::days(30),
        }
    }

    #[test]
    fn test_encode_decode() {
        let codec = CookieCodec::new([7u8; 32]);
        let p = payload();
        let token = codec.encode(&p).unwrap();
        assert!(!token.contains('='));
        assert!(!token.contains('+') && !token.contains('/'));
        assert_eq!(codec.decode(&token), Some(p));
    }

    #[test]
    fn test_nonce_is_fresh_per_encode() {
        let codec = CookieCodec::new([7u8; 32]);
        let p = payload();
        assert_ne!(codec.encode(&p).unwrap(), codec.encode(&p).unwrap());
    }

    #[test]
    fn test_tampered_token_fails_closed() {
        let codec = CookieCodec::new([7u8; 32]);
        let token = codec.encode(&payload()).unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(codec.decode(&URL_SAFE_NO_PAD.encode(raw)).is_none());
    }

    #[test]
    fn test_wrong_key_fails_closed() {
        let token = CookieCodec::new([7u8; 32]).encode(&payload()).unwrap();
        assert!(CookieCodec::new([8u8; 32]).decode(&token).is_none());
    }

    #[test]
    fn test_malformed_tokens_fail_closed() {
        let codec = CookieCodec::new([7u8; 32]);
        assert!(codec.decode("").is_none());
        assert!(codec.decode("not base64 !!").is_none());
        assert!(codec.decode("AAAA").is_none());
        assert!(codec.decode(&URL_SAFE_NO_PAD.encode([0u8; 40])).is_none());
    }

    #[test]
    fn test_from_config_requires_key_in_production() {
        let mut cfg = TrackingConfig {
            fallback_secret: Some("shared".into()),
            ..Default::default()
        };
        assert!(CookieCodec::from_config(&cfg, true).is_err());

        cfg.encryption_key = Some(STANDARD.encode([1u8; 32]));
        assert!(CookieCodec::from_config(&cfg, true).is_ok());

        cfg.encryption_key = Some(STANDARD.encode([1u8; 16]));
        assert!(CookieCodec::from_config(&cfg, true).is_err());
    }

    #[test]
    fn test_fallback_secret_is_deterministic() {
        let cfg = TrackingConfig {
            fallback_secret: Some("shared".into()),
            ..Default::default()
        };
        let a = CookieCodec::from_config(&cfg, false).unwrap();
        let b = CookieCodec::from_config(&cfg, false).unwrap();
        let token = a.encode(&payload()).unwrap();
        assert!(b.decode(&token).is_some());
    }
}
