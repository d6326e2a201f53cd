//! Configuration types for privacy network services.
//!
//! A service describes how it signs envelopes in a YAML file:
//!
//! ```yaml
//! version: "1"
//! jwt:
//!   issuer: bob.com
//!   algorithm: RS256
//!   private_key_file: keys/rsa-private.pem
//!   public_key_file: keys/rsa-public.pem
//!   x509_cert_file: keys/rsa.x509crt
//! ```
//!
//! Relative key paths are resolved against the directory holding the file
//! when loaded with [`PnConfig::load_with_context`].

pub mod jwt;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use jwt::{Algorithm, JwtConfig, SigningConfig, SigningKey};

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PnConfig {
    /// Configuration version.
    #[serde(default)]
    pub version: Option<String>,

    /// Envelope signing configuration.
    #[serde(default)]
    pub jwt: JwtConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PnConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration, anchoring relative key paths at the file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let jwt = &mut config.jwt;
        for file in [
            &mut jwt.secret_file,
            &mut jwt.private_key_file,
            &mut jwt.public_key_file,
            &mut jwt.x509_cert_file,
        ] {
            if let Some(p) = file.as_mut() {
                if !p.is_absolute() {
                    *p = base_dir.join(&*p);
                }
            }
        }

        Ok(config)
    }

    /// Resolve the signing configuration described by the `jwt` section.
    pub fn signing_config(&self) -> Result<SigningConfig, ConfigError> {
        self.jwt.resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_yaml_defaults() {
        let config = PnConfig::from_yaml("version: \"1\"\n").unwrap();
        assert_eq!(config.version.as_deref(), Some("1"));
        assert_eq!(config.jwt.algorithm, Algorithm::Hs256);
        assert!(config.jwt.issuer.is_none());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let err = PnConfig::from_yaml("jwt:\n  algorithm: none\n").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_load_with_context_resolves_relative_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("secret.txt"), "s3cret\n").unwrap();
        fs::write(
            dir.path().join("pn.yaml"),
            "jwt:\n  issuer: bob.com\n  algorithm: HS256\n  secret_file: secret.txt\n",
        )
        .unwrap();

        let config = PnConfig::load_with_context(dir.path().join("pn.yaml")).unwrap();
        assert_eq!(config.jwt.secret_file, Some(dir.path().join("secret.txt")));

        let signing = config.signing_config().unwrap();
        assert_eq!(signing.issuer.as_deref(), Some("bob.com"));
        assert_eq!(signing.key, SigningKey::Hs256 { secret: "s3cret".into() });
    }
}
