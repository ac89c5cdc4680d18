//! Standard Webhooks signature verification.
//!
//! The provider signs `"{webhook-id}.{webhook-timestamp}.{body}"` with
//! HMAC-SHA256 and sends the base64 digest in `webhook-signature` as one or
//! more space-separated `v1,<sig>` entries.

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

const SECRET_PREFIX: &str = "whsec_";

/// Why an inbound webhook was refused.  Always answered with HTTP 400.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthenticationError {
    #[error("missing header {0}")]
    MissingHeader(&'static str),
    #[error("invalid webhook timestamp")]
    InvalidTimestamp,
    #[error("webhook timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("no matching webhook signature")]
    NoMatchingSignature,
    #[error("malformed webhook payload: {0}")]
    MalformedEnvelope(String),
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
    tolerance_secs: u64,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("key", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl WebhookVerifier {
    /// `secret` is either `whsec_<base64>` or raw key material.
    pub fn new(secret: &str, tolerance_secs: u64) -> vm_domain::Result<Self> {
        let key = match secret.strip_prefix(SECRET_PREFIX) {
            Some(encoded) => B64.decode(encoded).map_err(|e| {
                vm_domain::Error::Config(format!("webhook secret is not valid base64: {e}"))
            })?,
            None => secret.as_bytes().to_vec(),
        };
        if key.is_empty() {
            return Err(vm_domain::Error::Config("webhook secret is empty".into()));
        }
        Ok(Self {
            key,
            tolerance_secs,
        })
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthenticationError> {
        self.verify_at(headers, body, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        headers: &HeaderMap,
        body: &[u8],
        now: i64,
    ) -> Result<(), AuthenticationError> {
        let id = header(headers, HEADER_ID)?;
        let ts_raw = header(headers, HEADER_TIMESTAMP)?;
        let signatures = header(headers, HEADER_SIGNATURE)?;

        let ts: i64 = ts_raw
            .trim()
            .parse()
            .map_err(|_| AuthenticationError::InvalidTimestamp)?;
        if now.abs_diff(ts) > self.tolerance_secs {
            return Err(AuthenticationError::TimestampOutOfTolerance);
        }

        let expected = self.digest(id, ts_raw.trim(), body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| B64.decode(sig).ok())
            .any(|candidate| candidate.ct_eq(&expected).unwrap_u8() == 1);

        if matched {
            Ok(())
        } else {
            Err(AuthenticationError::NoMatchingSignature)
        }
    }

    /// The `webhook-signature` value for a payload (`v1,<base64>`).
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        match self.digest(id, &timestamp.to_string(), body) {
            Ok(d) => format!("v1,{}", B64.encode(d)),
            Err(_) => String::new(),
        }
    }

    fn digest(&self, id: &str, ts: &str, body: &[u8]) -> Result<Vec<u8>, AuthenticationError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|_| AuthenticationError::NoMatchingSignature)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(ts.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AuthenticationError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(AuthenticationError::MissingHeader(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const NOW: i64 = 1_700_000_000;

    fn verifier() -> WebhookVerifier {
        // base64("test-secret-key")
        WebhookVerifier::new("whsec_dGVzdC1zZWNyZXQta2V5", 300).unwrap()
    }

    fn headers(id: &str, ts: i64, sig: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(HEADER_ID, HeaderValue::from_str(id).unwrap());
        h.insert(HEADER_TIMESTAMP, HeaderValue::from_str(&ts.to_string()).unwrap());
        h.insert(HEADER_SIGNATURE, HeaderValue::from_str(sig).unwrap());
        h
    }

    #[test]
    fn valid_signature_passes() {
        let v = verifier();
        let body = br#"{"type":"realtime.call.incoming"}"#;
        let sig = v.sign("msg_1", NOW, body);
        assert!(v.verify_at(&headers("msg_1", NOW, &sig), body, NOW).is_ok());
    }

    #[test]
    fn any_matching_entry_passes() {
        let v = verifier();
        let body = b"{}";
        let good = v.sign("msg_1", NOW, body);
        let list = format!("v1,Zm9vYmFy {good} v2,ignored");
        assert!(v.verify_at(&headers("msg_1", NOW, &list), body, NOW).is_ok());
    }

    #[test]
    fn tampered_body_fails() {
        let v = verifier();
        let sig = v.sign("msg_1", NOW, b"original");
        assert_eq!(
            v.verify_at(&headers("msg_1", NOW, &sig), b"tampered", NOW),
            Err(AuthenticationError::NoMatchingSignature)
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let other = WebhookVerifier::new("whsec_b3RoZXI=", 300).unwrap();
        let sig = other.sign("msg_1", NOW, b"{}");
        assert!(verifier().verify_at(&headers("msg_1", NOW, &sig), b"{}", NOW).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let v = verifier();
        let ts = NOW - 301;
        let sig = v.sign("msg_1", ts, b"{}");
        assert_eq!(
            v.verify_at(&headers("msg_1", ts, &sig), b"{}", NOW),
            Err(AuthenticationError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn extreme_timestamps_are_out_of_tolerance() {
        let v = verifier();
        for ts in [i64::MIN, i64::MAX] {
            let sig = v.sign("msg_1", ts, b"{}");
            assert_eq!(
                v.verify_at(&headers("msg_1", ts, &sig), b"{}", NOW),
                Err(AuthenticationError::TimestampOutOfTolerance)
            );
        }
    }

    #[test]
    fn missing_header_fails() {
        let v = verifier();
        let mut h = headers("msg_1", NOW, "v1,x");
        h.remove(HEADER_SIGNATURE);
        assert_eq!(
            v.verify_at(&h, b"{}", NOW),
            Err(AuthenticationError::MissingHeader(HEADER_SIGNATURE))
        );
    }

    #[test]
    fn unprefixed_secret_is_raw_bytes() {
        let raw = WebhookVerifier::new("test-secret-key", 300).unwrap();
        let sig = raw.sign("msg_1", NOW, b"{}");
        assert!(verifier().verify_at(&headers("msg_1", NOW, &sig), b"{}", NOW).is_ok());
    }

    #[test]
    fn bad_base64_secret_is_config_error() {
        assert!(WebhookVerifier::new("whsec_***", 300).is_err());
    }
}
