//! # pn-jwt
//!
//! Signed claim envelopes exchanged between privacy network services.
//!
//! This crate provides functionality for:
//! - Building one envelope per message kind (subject records, queries,
//!   acknowledgements, ...) from typed inputs
//! - Signing with a shared secret (HS256) or an RSA key (RS256)
//! - Verifying against a known configuration, or by the algorithm the
//!   token itself declares
//! - Decoding tokens without verification, for inspection
//!
//! ## Algorithms
//!
//! | Algorithm | Signs with | Verifies with |
//! |-----------|------------|---------------|
//! | **HS256** | Shared secret | The same shared secret |
//! | **RS256** | RSA private key | Public key embedded in the token header |
//!
//! RS256 envelopes carry the signer's PEM public key and X.509 certificate
//! in their header, so a receiver with no prior configuration can check the
//! signature. The certificate is embedded as-is and is not validated here.
//!
//! ## Example
//!
//! ```no_run
//! use pn_jwt::{EnvelopeBuilder, EnvelopeProps, EnvelopeVerifier, SigningConfig};
//! use serde_json::json;
//!
//! let config = SigningConfig::hs256("bob.com", "secret");
//! let builder = EnvelopeBuilder::new(config.clone());
//!
//! let token = builder.sign_metadata(
//!     json!({"@type": "http://localhost/md#1"}),
//!     &EnvelopeProps::new().subject("http://md.example.com/1"),
//! )?;
//!
//! let claims = EnvelopeVerifier::new(config).verify(&token)?;
//! assert_eq!(claims.issuer(), Some("bob.com"));
//! # Ok::<(), pn_jwt::EnvelopeError>(())
//! ```

pub mod claims;
pub mod codec;
pub mod error;
pub mod id;
mod keys;
pub mod token;

pub use claims::{ClaimSet, EnvelopeProps};
pub use codec::{DecodedToken, decode, hash_token};
pub use error::EnvelopeError;
pub use id::{CounterIdGenerator, IdGenerator, UuidIdGenerator};
pub use pn_core::{Algorithm, MessageKind, SigningConfig, SigningKey};
pub use token::{EnvelopeBuilder, EnvelopeVerifier, verify_auto};
