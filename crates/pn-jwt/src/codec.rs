//! Compact token encoding: `base64url(header).base64url(payload).signature`.
//!
//! The HMAC and RSA signatures themselves come from `jsonwebtoken`'s crypto
//! primitives. Segments are assembled here because the header has to carry
//! private parameters (the signer's PEM public key and certificate) that
//! the registered JOSE header fields cannot hold.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, crypto};
use pn_core::Algorithm;
use pn_core::claims::{header, registered};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::claims::ClaimSet;
use crate::error::EnvelopeError;
use crate::keys::primitive_algorithm;

/// JOSE header parameters.
pub type Header = Map<String, Value>;

/// A token split into its parts, without any signature check.
///
/// Never base a trust decision on a decoded token; verify it instead.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedToken {
    pub header: Header,
    pub payload: ClaimSet,
    /// The base64url signature segment, as found in the token.
    pub signature: String,
}

impl DecodedToken {
    /// The declared `alg` header value.
    pub fn alg(&self) -> Option<&str> {
        self.header.get("alg").and_then(Value::as_str)
    }

    /// The declared algorithm, if it is one this crate can verify.
    pub fn algorithm(&self) -> Result<Algorithm, EnvelopeError> {
        let alg = self
            .alg()
            .ok_or_else(|| EnvelopeError::MalformedToken("header has no alg".to_string()))?;
        alg.parse()
            .map_err(|_| EnvelopeError::UnsupportedAlgorithm(alg.to_string()))
    }

    /// PEM public key embedded by an RS256 signer.
    pub fn embedded_public_key(&self) -> Option<&str> {
        self.header.get(header::PUBLIC_KEY_PEM).and_then(Value::as_str)
    }

    /// PEM certificate embedded by an RS256 signer. Not validated by this crate.
    pub fn embedded_certificate(&self) -> Option<&str> {
        self.header.get(header::X509_CERT_PEM).and_then(Value::as_str)
    }
}

/// Decode a token without checking its signature.
pub fn decode(token: &str) -> Result<DecodedToken, EnvelopeError> {
    let (header_b64, payload_b64, signature) = split(token)?;

    Ok(DecodedToken {
        header: decode_segment("header", header_b64)?,
        payload: decode_segment("payload", payload_b64)?,
        signature: signature.to_string(),
    })
}

/// Hex encoded SHA-256 over the whole token (header, payload and signature).
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub(crate) fn sign(
    header: &Header,
    payload: &ClaimSet,
    key: &EncodingKey,
    algorithm: Algorithm,
) -> Result<String, EnvelopeError> {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?);
    let payload_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let signature = crypto::sign(signing_input.as_bytes(), key, primitive_algorithm(algorithm))
        .map_err(|e| EnvelopeError::Crypto(e.to_string()))?;

    Ok(format!("{signing_input}.{signature}"))
}

/// Check the signature of an already decoded `token` and its expiry.
pub(crate) fn verify(
    token: &str,
    decoded: DecodedToken,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<ClaimSet, EnvelopeError> {
    let declared = decoded.algorithm()?;
    if declared != algorithm {
        return Err(EnvelopeError::AlgorithmMismatch {
            expected: algorithm.to_string(),
            found: declared.to_string(),
        });
    }

    let (header_b64, payload_b64, signature) = split(token)?;
    let signing_input = format!("{header_b64}.{payload_b64}");

    let valid = crypto::verify(
        signature,
        signing_input.as_bytes(),
        key,
        primitive_algorithm(algorithm),
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::Base64(_) => {
            EnvelopeError::MalformedToken(format!("signature is not base64url: {e}"))
        }
        _ => EnvelopeError::Crypto(e.to_string()),
    })?;

    if !valid {
        return Err(EnvelopeError::InvalidSignature);
    }

    check_expiry(&decoded.payload)?;
    Ok(decoded.payload)
}

/// A present `exp` must be a JSON number; it may be fractional.
fn check_expiry(payload: &ClaimSet) -> Result<(), EnvelopeError> {
    let Some(exp) = payload.get(registered::EXPIRES_AT) else {
        return Ok(());
    };
    let exp = exp
        .as_f64()
        .ok_or_else(|| EnvelopeError::MalformedToken(format!("exp is not a number: {exp}")))?;

    if Utc::now().timestamp() as f64 >= exp {
        let expired_at = DateTime::<Utc>::from_timestamp(exp.floor() as i64, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| exp.to_string());
        return Err(EnvelopeError::TokenExpired { expired_at });
    }
    Ok(())
}

fn split(token: &str) -> Result<(&str, &str, &str), EnvelopeError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None) => Ok((header, payload, signature)),
        _ => Err(EnvelopeError::MalformedToken(
            "expected three dot separated segments".to_string(),
        )),
    }
}

fn decode_segment<T: DeserializeOwned>(name: &str, segment: &str) -> Result<T, EnvelopeError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| EnvelopeError::MalformedToken(format!("{name} is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| EnvelopeError::MalformedToken(format!("{name} is not a JSON object: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys;
    use pn_core::SigningKey;
    use serde_json::json;

    fn hs256_token(payload: &ClaimSet) -> String {
        let mut header = Header::new();
        header.insert("alg".into(), json!("HS256"));
        header.insert("typ".into(), json!("JWT"));
        let key = keys::encoding_key(&SigningKey::Hs256 { secret: "secret".into() }).unwrap();
        sign(&header, payload, &key, Algorithm::Hs256).unwrap()
    }

    #[test]
    fn test_decode_is_repeatable() {
        let token = hs256_token(&ClaimSet::new().with("a", 1));
        let first = decode(&token).unwrap();
        let second = decode(&token).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.alg(), Some("HS256"));
        assert_eq!(first.payload.get("a"), Some(&json!(1)));
        assert!(first.embedded_public_key().is_none());
    }

    #[test]
    fn test_decode_rejects_wrong_segment_count() {
        assert!(matches!(decode("a.b"), Err(EnvelopeError::MalformedToken(_))));
        assert!(matches!(decode("a.b.c.d"), Err(EnvelopeError::MalformedToken(_))));
        assert!(matches!(decode("!!!.???.sig"), Err(EnvelopeError::MalformedToken(_))));
    }

    #[test]
    fn test_decode_rejects_non_object_payload() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        let token = format!("{header}.{payload}.sig");
        assert!(matches!(decode(&token), Err(EnvelopeError::MalformedToken(_))));
    }

    #[test]
    fn test_unknown_alg_is_unsupported() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        let decoded = decode(&format!("{header}.{payload}.")).unwrap();
        let err = decoded.algorithm().unwrap_err();
        assert!(matches!(&err, EnvelopeError::UnsupportedAlgorithm(alg) if alg == "none"));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_verify_checks_expiry() {
        let past = Utc::now().timestamp() - 60;
        let token = hs256_token(&ClaimSet::new().with("exp", past));
        let key = keys::hmac_secret("secret").unwrap();
        let err = verify(&token, decode(&token).unwrap(), &key, Algorithm::Hs256).unwrap_err();
        assert!(matches!(err, EnvelopeError::TokenExpired { .. }));
    }

    #[test]
    fn test_verify_checks_fractional_expiry() {
        let token = hs256_token(&ClaimSet::new().with("iss", "bob.com").with("exp", 1000.5));
        let key = keys::hmac_secret("secret").unwrap();
        let err = verify(&token, decode(&token).unwrap(), &key, Algorithm::Hs256).unwrap_err();
        assert!(matches!(err, EnvelopeError::TokenExpired { .. }));

        let later = Utc::now().timestamp() as f64 + 3600.5;
        let token = hs256_token(&ClaimSet::new().with("exp", later));
        assert!(verify(&token, decode(&token).unwrap(), &key, Algorithm::Hs256).is_ok());
    }

    #[test]
    fn test_verify_rejects_non_numeric_expiry() {
        let key = keys::hmac_secret("secret").unwrap();
        for exp in [json!("1000"), json!(null), json!({"at": 1000})] {
            let token = hs256_token(&ClaimSet::new().with("iss", "bob.com").with("exp", exp));
            let err = verify(&token, decode(&token).unwrap(), &key, Algorithm::Hs256).unwrap_err();
            assert!(matches!(&err, EnvelopeError::MalformedToken(msg) if msg.contains("exp")));
            assert!(!err.is_configuration_error());
        }
    }

    #[test]
    fn test_verify_rejects_algorithm_mismatch() {
        let token = hs256_token(&ClaimSet::new());
        let key = keys::hmac_secret("secret").unwrap();
        let err = verify(&token, decode(&token).unwrap(), &key, Algorithm::Rs256).unwrap_err();
        assert!(matches!(err, EnvelopeError::AlgorithmMismatch { .. }));
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
