//! HMAC-SHA256 bearer-token verification for the spectator WebSocket endpoint.
//!
//! No `jsonwebtoken` crate appears anywhere in this dependency stack, so
//! verification is done directly against `ring::hmac`, which the TLS layer
//! already depends on. Only HS256 compact JWTs are supported — enough to
//! validate a token minted elsewhere against a shared secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ring::hmac;
use serde::Deserialize;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("signature verification failed")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub match_id: Option<String>,
    pub exp: Option<i64>,
}

/// Verify a compact `header.payload.signature` JWT against `secret` and
/// return its claims. The caller is responsible for checking `claims.sub`
/// and `claims.match_id` authorize the requested match.
pub fn verify(token: &str, secret: &[u8], now_unix: i64) -> Result<Claims, AuthError> {
    let mut parts = token.split('.');
    let (header_b64, payload_b64, sig_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) => (h, p, s),
        _ => return Err(AuthError::Malformed),
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_b64).map_err(|_| AuthError::Malformed)?;
    let header: Header = serde_json::from_slice(&header_bytes).map_err(|_| AuthError::Malformed)?;
    if header.alg != "HS256" {
        return Err(AuthError::UnsupportedAlgorithm);
    }

    let signature = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| AuthError::Malformed)?;
    let signing_input = format!("{header_b64}.{payload_b64}");
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
    hmac::verify(&key, signing_input.as_bytes(), &signature).map_err(|_| AuthError::BadSignature)?;

    let payload_bytes = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| AuthError::Malformed)?;
    let claims: Claims = serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::Malformed)?;

    if let Some(exp) = claims.exp {
        if exp < now_unix {
            return Err(AuthError::Expired);
        }
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(header: &str, payload: &str, secret: &[u8]) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);
        let signing_input = format!("{header_b64}.{payload_b64}");
        let key = hmac::Key::new(hmac::HMAC_SHA256, secret);
        let tag = hmac::sign(&key, signing_input.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());
        format!("{header_b64}.{payload_b64}.{sig_b64}")
    }

    #[test]
    fn valid_token_verifies() {
        let secret = b"topsecret";
        let token = sign(
            r#"{"alg":"HS256","typ":"JWT"}"#,
            r#"{"sub":"spectator-1","match_id":"match-1","exp":9999999999}"#,
            secret,
        );
        let claims = verify(&token, secret, 0).unwrap();
        assert_eq!(claims.sub, "spectator-1");
        assert_eq!(claims.match_id.as_deref(), Some("match-1"));
    }

    #[test]
    fn tampered_signature_rejected() {
        let secret = b"topsecret";
        let token = sign(r#"{"alg":"HS256"}"#, r#"{"sub":"x","exp":9999999999}"#, secret);
        let bad = token.replace(secret.len().to_string().as_str(), "00");
        let result = verify(&bad, b"wrong-secret", 0);
        assert!(result.is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let secret = b"topsecret";
        let token = sign(r#"{"alg":"HS256"}"#, r#"{"sub":"x","exp":1}"#, secret);
        let result = verify(&token, secret, 1000);
        assert_eq!(result, Err(AuthError::Expired));
    }

    #[test]
    fn unsupported_algorithm_rejected() {
        let secret = b"topsecret";
        let token = sign(r#"{"alg":"none"}"#, r#"{"sub":"x"}"#, secret);
        let result = verify(&token, secret, 0);
        assert_eq!(result, Err(AuthError::UnsupportedAlgorithm));
    }
}
