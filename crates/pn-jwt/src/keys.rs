//! Key material for the signature primitive.

use jsonwebtoken::{DecodingKey, EncodingKey};
use pn_core::{Algorithm, SigningKey};

use crate::error::EnvelopeError;

pub(crate) fn primitive_algorithm(algorithm: Algorithm) -> jsonwebtoken::Algorithm {
    match algorithm {
        Algorithm::Hs256 => jsonwebtoken::Algorithm::HS256,
        Algorithm::Rs256 => jsonwebtoken::Algorithm::RS256,
    }
}

/// Key used to sign with `key`.
pub(crate) fn encoding_key(key: &SigningKey) -> Result<EncodingKey, EnvelopeError> {
    match key {
        SigningKey::Hs256 { secret } => {
            Ok(EncodingKey::from_secret(require("secret", secret)?.as_bytes()))
        }
        SigningKey::Rs256 {
            private_key_pem, ..
        } => EncodingKey::from_rsa_pem(require("private_key", private_key_pem)?.as_bytes())
            .map_err(|e| EnvelopeError::InvalidKey(format!("private_key: {e}"))),
    }
}

/// Key used to verify tokens signed with `key`.
pub(crate) fn decoding_key(key: &SigningKey) -> Result<DecodingKey, EnvelopeError> {
    match key {
        SigningKey::Hs256 { secret } => hmac_secret(secret),
        SigningKey::Rs256 { public_key_pem, .. } => {
            rsa_public_key(require("public_key", public_key_pem)?)
        }
    }
}

pub(crate) fn hmac_secret(secret: &str) -> Result<DecodingKey, EnvelopeError> {
    Ok(DecodingKey::from_secret(require("secret", secret)?.as_bytes()))
}

pub(crate) fn rsa_public_key(pem: &str) -> Result<DecodingKey, EnvelopeError> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| EnvelopeError::InvalidKey(format!("public_key: {e}")))
}

/// Public key carried in a received token's header.
pub(crate) fn embedded_public_key(pem: &str) -> Result<DecodingKey, EnvelopeError> {
    DecodingKey::from_rsa_pem(pem.as_bytes())
        .map_err(|e| EnvelopeError::InvalidEmbeddedKey(e.to_string()))
}

pub(crate) fn require<'a>(field: &str, value: &'a str) -> Result<&'a str, EnvelopeError> {
    if value.is_empty() {
        Err(EnvelopeError::missing(field))
    } else {
        Ok(value)
    }
}
