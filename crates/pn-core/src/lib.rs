//! # pn-core
//!
//! Shared vocabulary for privacy network envelopes:
//!
//! - [`claims`]: the closed set of claim identifiers and [`MessageKind`] tags
//! - [`config`]: signing configuration, in memory ([`SigningConfig`]) and as
//!   loaded from YAML ([`PnConfig`])

pub mod claims;
pub mod config;

pub use claims::MessageKind;
pub use config::{Algorithm, ConfigError, JwtConfig, PnConfig, SigningConfig, SigningKey};
