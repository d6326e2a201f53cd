//! Error types for envelope operations.

use thiserror::Error;

/// Errors that can occur while signing, decoding or verifying envelopes.
///
/// `MissingField`, `InvalidKey`, `ReservedClaim` and `InvalidGraph` are caller
/// mistakes and are always raised before anything is signed. The remaining
/// variants describe tokens that fail to decode or verify.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A required input, property or configuration value is absent.
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// The token header declares an algorithm other than HS256 or RS256.
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Configured key material could not be parsed.
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// The public key embedded in a token header could not be parsed.
    #[error("invalid embedded public key: {0}")]
    InvalidEmbeddedKey(String),

    /// Payload already carries a claim the signing routine sets itself.
    #[error("payload must not set registered claim: {claim}")]
    ReservedClaim { claim: String },

    /// Pipe data without a top level `@graph`.
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Token is not three well formed base64url JSON segments.
    #[error("malformed token: {0}")]
    MalformedToken(String),

    /// Token header declares a different algorithm than the verification key.
    #[error("algorithm mismatch: expected {expected}, token declares {found}")]
    AlgorithmMismatch { expected: String, found: String },

    /// Signature does not match the header and payload.
    #[error("invalid signature")]
    InvalidSignature,

    /// Token has expired.
    #[error("token has expired at {expired_at}")]
    TokenExpired { expired_at: String },

    /// Token header is missing a claim required for verification.
    #[error("token header missing required claim: {claim}")]
    MissingHeaderClaim { claim: String },

    /// Error reported by the signature primitive.
    #[error("signature primitive error: {0}")]
    Crypto(String),

    /// Failed to serialize a claim set.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EnvelopeError {
    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Whether the error is a caller configuration mistake rather than a bad token.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MissingField { .. }
                | Self::InvalidKey(_)
                | Self::ReservedClaim { .. }
                | Self::InvalidGraph(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_side_errors_are_not_configuration_errors() {
        assert!(!EnvelopeError::UnsupportedAlgorithm("ES256".into()).is_configuration_error());
        assert!(!EnvelopeError::InvalidEmbeddedKey("garbage".into()).is_configuration_error());
        assert!(!EnvelopeError::MalformedToken("exp".into()).is_configuration_error());
        assert!(EnvelopeError::InvalidKey("public_key".into()).is_configuration_error());
        assert!(EnvelopeError::missing("secret").is_configuration_error());
    }
}
