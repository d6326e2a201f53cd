//! Envelope construction and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::EncodingKey;
use pn_core::claims::{
    EMBEDDED_JWT_MESSAGE_CLAIM, ENCRYPT_KEY_MD_CLAIM, ERROR_CLAIM, JWT_ID_CLAIM,
    MESSAGE_ACK_ID_CLAIM, METADATA_CLAIM, PN_DATA_MODEL_CLAIM, PN_GRAPH_CLAIM,
    PRIVACY_PIPE_CLAIM, PROVISION_CLAIM, QUERY_CLAIM, SUBJECT_CLAIM, SUBJECT_JWTS_CLAIM,
    SUBJECT_LINK_CLAIM, SUBJECT_LINK_JWTS_CLAIM, SYNDICATE_REQUEST_CLAIM,
    SYNDICATION_ID_CLAIM, header, registered,
};
use pn_core::{Algorithm, MessageKind, SigningConfig, SigningKey};
use serde_json::Value;
use std::sync::Arc;

use crate::claims::{ClaimSet, EnvelopeProps};
use crate::codec::{self, Header};
use crate::error::EnvelopeError;
use crate::id::{CounterIdGenerator, IdGenerator};
use crate::keys::{self, require};

/// Signing parameters for one envelope, derived from the configuration and
/// the envelope's properties. The configuration itself is never modified.
struct SigningOptions {
    algorithm: Algorithm,
    issuer: String,
    subject: Option<String>,
    expires_in: Option<Duration>,
    header: Header,
    key: EncodingKey,
}

impl SigningOptions {
    fn resolve(config: &SigningConfig, props: &EnvelopeProps) -> Result<Self, EnvelopeError> {
        // props override the configured issuer; the subject only comes from props
        let issuer = props
            .issuer
            .as_deref()
            .or(config.issuer.as_deref())
            .filter(|i| !i.is_empty())
            .ok_or_else(|| EnvelopeError::missing("issuer"))?
            .to_string();

        let algorithm = config.algorithm();
        let mut params = Header::new();
        params.insert("alg".into(), algorithm.as_str().into());
        params.insert("typ".into(), "JWT".into());

        if let SigningKey::Rs256 {
            public_key_pem,
            x509_cert_pem,
            ..
        } = &config.key
        {
            // TODO: validate the certificate against the private key before embedding it
            params.insert(
                header::PUBLIC_KEY_PEM.into(),
                require("public_key", public_key_pem)?.into(),
            );
            params.insert(
                header::X509_CERT_PEM.into(),
                require("x509_cert", x509_cert_pem)?.into(),
            );
        }

        Ok(Self {
            algorithm,
            issuer,
            subject: props.subject.clone().filter(|s| !s.is_empty()),
            expires_in: props.expires_in,
            header: params,
            key: keys::encoding_key(&config.key)?,
        })
    }
}

/// Builds signed envelopes, one method per [`MessageKind`].
///
/// Every method checks all of its required inputs and the signing
/// configuration before anything is signed, so a failed call never yields a
/// partially built token.
#[derive(Clone)]
pub struct EnvelopeBuilder {
    config: SigningConfig,
    ids: Arc<dyn IdGenerator>,
}

impl EnvelopeBuilder {
    /// Create a builder using the process-wide counter for fallback ids.
    pub fn new(config: SigningConfig) -> Self {
        Self {
            config,
            ids: Arc::new(CounterIdGenerator),
        }
    }

    /// Replace the generator used when no explicit `jwt_id` is supplied.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn config(&self) -> &SigningConfig {
        &self.config
    }

    /// Sign an arbitrary claim set.
    ///
    /// Adds `iat`, `iss`, `sub` when supplied and `exp` when `expires_in` is
    /// set. The payload must not already contain any of them.
    pub fn sign_payload(
        &self,
        payload: ClaimSet,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        let options = SigningOptions::resolve(&self.config, props)?;
        self.sign_with(options, payload)
    }

    /// Wrap graph data in a v1 envelope.
    pub fn sign_data(&self, data: Value, props: &EnvelopeProps) -> Result<String, EnvelopeError> {
        require_value("data", &data)?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let mut payload = ClaimSet::for_kind(MessageKind::DataGraph).with(PN_GRAPH_CLAIM, data);
        if let Some(pipe) = props.privacy_pipe.as_deref().filter(|p| !p.is_empty()) {
            payload.insert(PRIVACY_PIPE_CLAIM, pipe);
        }

        self.sign_with(options, payload)
    }

    /// Wrap a JSON-LD graph sent down a privacy pipe.
    ///
    /// The graph needs a top level `@graph` and `props.privacy_pipe` is required.
    pub fn sign_pipe_data(
        &self,
        graph: Value,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("graph", &graph)?;
        if graph.get("@graph").is_none() {
            return Err(EnvelopeError::InvalidGraph(
                "graph must have a top level @graph property".to_string(),
            ));
        }
        props.require_privacy_pipe()?;

        self.sign_data(graph, props)
    }

    /// Metadata node, with an optional `props.provision` node.
    pub fn sign_metadata(
        &self,
        metadata: Value,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("metadata", &metadata)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let mut payload =
            ClaimSet::for_kind(MessageKind::Metadata).with(METADATA_CLAIM, metadata);
        if let Some(provision) = props.provision.clone().filter(|p| !p.is_null()) {
            payload.insert(PROVISION_CLAIM, provision);
        }

        self.sign_with(options, payload)
    }

    /// Provision node for a privacy pipe; `props.privacy_pipe` is required.
    pub fn sign_provision(
        &self,
        provision: Value,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("provision", &provision)?;
        props.require_subject()?;
        let pipe = props.require_privacy_pipe()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::Provision)
            .with(PROVISION_CLAIM, provision)
            .with(PRIVACY_PIPE_CLAIM, pipe);

        self.sign_with(options, payload)
    }

    /// Encrypt key metadata used by a privacy action instance.
    pub fn sign_encrypt_key_metadata(
        &self,
        metadata: Value,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("encrypt_key_metadata", &metadata)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::EncryptKeyMetadata)
            .with(ENCRYPT_KEY_MD_CLAIM, metadata);

        self.sign_with(options, payload)
    }

    /// Subject record produced by a syndication.
    ///
    /// `jwt_id` is `props.jwt_id` when given, otherwise generated from the subject.
    pub fn sign_subject(
        &self,
        subject: Value,
        pn_data_model_id: &str,
        syndication_id: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("subject", &subject)?;
        require("pn_data_model_id", pn_data_model_id)?;
        require("syndication_id", syndication_id)?;
        let sub = props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let mut payload = ClaimSet::for_kind(MessageKind::Subject)
            .with(PN_DATA_MODEL_CLAIM, pn_data_model_id)
            .with(SYNDICATION_ID_CLAIM, syndication_id)
            .with(SUBJECT_CLAIM, subject)
            .with(JWT_ID_CLAIM, self.jwt_id(props, sub));
        if let Some(pipe) = props.privacy_pipe.as_deref().filter(|p| !p.is_empty()) {
            payload.insert(PRIVACY_PIPE_CLAIM, pipe);
        }

        self.sign_with(options, payload)
    }

    /// Subject link record produced by a syndication.
    pub fn sign_subject_link(
        &self,
        link: Value,
        syndication_id: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("link", &link)?;
        require("syndication_id", syndication_id)?;
        let sub = props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let mut payload = ClaimSet::for_kind(MessageKind::SubjectLink)
            .with(SYNDICATION_ID_CLAIM, syndication_id)
            .with(SUBJECT_LINK_CLAIM, link)
            .with(JWT_ID_CLAIM, self.jwt_id(props, sub));
        if let Some(pipe) = props.privacy_pipe.as_deref().filter(|p| !p.is_empty()) {
            payload.insert(PRIVACY_PIPE_CLAIM, pipe);
        }

        self.sign_with(options, payload)
    }

    /// Syndicate request carrying the subject envelopes being syndicated.
    pub fn sign_syndicate_request(
        &self,
        request: Value,
        subject_jwts: &[String],
        privacy_pipe_id: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("syndicate_request", &request)?;
        require("privacy_pipe_id", privacy_pipe_id)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::SyndicateRequest)
            .with(SYNDICATE_REQUEST_CLAIM, request)
            .with(SUBJECT_JWTS_CLAIM, subject_jwts.to_vec())
            .with(PRIVACY_PIPE_CLAIM, privacy_pipe_id);

        self.sign_with(options, payload)
    }

    /// Resource service query. `subject` is a single node or an array of them.
    pub fn sign_rs_query(
        &self,
        query: Value,
        subject: Value,
        privacy_pipe_id: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("query", &query)?;
        require_value("subject", &subject)?;
        require("privacy_pipe_id", privacy_pipe_id)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::RsQuery)
            .with(QUERY_CLAIM, query)
            .with(SUBJECT_CLAIM, subject)
            .with(PRIVACY_PIPE_CLAIM, privacy_pipe_id);

        self.sign_with(options, payload)
    }

    /// Resource service query result.
    pub fn sign_rs_query_result(
        &self,
        query: Value,
        subject_jwts: &[String],
        subject_link_jwts: &[String],
        privacy_pipe_id: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("query", &query)?;
        require("privacy_pipe_id", privacy_pipe_id)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::RsQueryResult)
            .with(QUERY_CLAIM, query)
            .with(SUBJECT_JWTS_CLAIM, subject_jwts.to_vec())
            .with(SUBJECT_LINK_JWTS_CLAIM, subject_link_jwts.to_vec())
            .with(PRIVACY_PIPE_CLAIM, privacy_pipe_id);

        self.sign_with(options, payload)
    }

    /// Resource service proxy query result wrapping one complete envelope.
    pub fn sign_rsp_query_result(
        &self,
        query: Value,
        message: &str,
        props: &EnvelopeProps,
    ) -> Result<String, EnvelopeError> {
        require_value("query", &query)?;
        require("message", message)?;
        props.require_subject()?;
        let options = SigningOptions::resolve(&self.config, props)?;

        let payload = ClaimSet::for_kind(MessageKind::RspQueryResult)
            .with(QUERY_CLAIM, query)
            .with(EMBEDDED_JWT_MESSAGE_CLAIM, message);

        self.sign_with(options, payload)
    }

    /// Acknowledge message `id`. The id is also the envelope subject.
    pub fn sign_message_ack(&self, id: &str) -> Result<String, EnvelopeError> {
        require("id", id)?;
        let options = SigningOptions::resolve(&self.config, &EnvelopeProps::new().subject(id))?;

        let payload =
            ClaimSet::for_kind(MessageKind::MessageAck).with(MESSAGE_ACK_ID_CLAIM, id);

        self.sign_with(options, payload)
    }

    /// Report `error` for message `id`. The id is also the envelope subject.
    pub fn sign_error(&self, id: &str, error: Value) -> Result<String, EnvelopeError> {
        require("id", id)?;
        require_value("error", &error)?;
        let options = SigningOptions::resolve(&self.config, &EnvelopeProps::new().subject(id))?;

        let payload = ClaimSet::for_kind(MessageKind::Error)
            .with(MESSAGE_ACK_ID_CLAIM, id)
            .with(ERROR_CLAIM, error);

        self.sign_with(options, payload)
    }

    fn jwt_id(&self, props: &EnvelopeProps, subject: &str) -> String {
        match props.jwt_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.ids.next_id(subject),
        }
    }

    fn sign_with(
        &self,
        options: SigningOptions,
        mut payload: ClaimSet,
    ) -> Result<String, EnvelopeError> {
        for claim in [
            registered::ISSUER,
            registered::SUBJECT,
            registered::ISSUED_AT,
            registered::EXPIRES_AT,
        ] {
            if payload.contains(claim) {
                return Err(EnvelopeError::ReservedClaim {
                    claim: claim.to_string(),
                });
            }
        }

        let now = Utc::now();
        payload.insert(registered::ISSUED_AT, now.timestamp());
        if let Some(expires_in) = options.expires_in {
            payload.insert(registered::EXPIRES_AT, (now + expires_in).timestamp());
        }
        payload.insert(registered::ISSUER, options.issuer.as_str());
        if let Some(subject) = &options.subject {
            payload.insert(registered::SUBJECT, subject.as_str());
        }

        tracing::debug!(
            kind = ?payload.kind(),
            alg = %options.algorithm,
            issuer = %options.issuer,
            "Signing envelope"
        );

        codec::sign(&options.header, &payload, &options.key, options.algorithm)
    }
}

/// Verifies envelopes against a known signing configuration.
#[derive(Debug, Clone)]
pub struct EnvelopeVerifier {
    config: SigningConfig,
}

impl EnvelopeVerifier {
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Verify `token` with the configured key: the shared secret for HS256,
    /// the configured public key for RS256.
    ///
    /// Issuer and subject are returned, not checked.
    pub fn verify(&self, token: &str) -> Result<ClaimSet, EnvelopeError> {
        let decoded = codec::decode(token)?;
        let algorithm = self.config.algorithm();
        let key = keys::decoding_key(&self.config.key)?;

        tracing::debug!(alg = %algorithm, "Verifying envelope against configuration");
        codec::verify(token, decoded, &key, algorithm).inspect_err(log_rejection)
    }

    /// Verify `token` and return its graph data claim.
    pub fn verify_graph(&self, token: &str) -> Result<Option<Value>, EnvelopeError> {
        let claims = self.verify(token)?;
        Ok(claims.graph().cloned())
    }

    /// [`verify_auto`] with this verifier's configuration.
    pub fn verify_auto(&self, token: &str) -> Result<ClaimSet, EnvelopeError> {
        verify_auto(token, Some(&self.config))
    }
}

/// Verify `token` by the algorithm its own header declares.
///
/// RS256 tokens are checked against the public key embedded in their header,
/// so no configuration is needed. The embedded certificate is not validated;
/// callers that need that must check
/// [`DecodedToken::embedded_certificate`](crate::DecodedToken::embedded_certificate)
/// themselves. HS256 tokens need the shared secret from `config`.
pub fn verify_auto(token: &str, config: Option<&SigningConfig>) -> Result<ClaimSet, EnvelopeError> {
    let decoded = codec::decode(token)?;
    let algorithm = decoded.algorithm()?;

    let key = match algorithm {
        Algorithm::Rs256 => {
            let pem = decoded
                .embedded_public_key()
                .ok_or_else(|| EnvelopeError::MissingHeaderClaim {
                    claim: header::PUBLIC_KEY_PEM.to_string(),
                })?;
            keys::embedded_public_key(pem)?
        }
        Algorithm::Hs256 => match config.map(|c| &c.key) {
            Some(SigningKey::Hs256 { secret }) => keys::hmac_secret(secret)?,
            _ => return Err(EnvelopeError::missing("secret")),
        },
    };

    tracing::debug!(alg = %algorithm, "Verifying envelope by declared algorithm");
    codec::verify(token, decoded, &key, algorithm).inspect_err(log_rejection)
}

fn log_rejection(error: &EnvelopeError) {
    tracing::warn!(error = %error, "Envelope verification failed");
}

fn require_value(field: &str, value: &Value) -> Result<(), EnvelopeError> {
    match value {
        Value::Null => Err(EnvelopeError::missing(field)),
        Value::String(s) if s.is_empty() => Err(EnvelopeError::missing(field)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hs256() -> SigningConfig {
        SigningConfig::hs256("bob.com", "secret")
    }

    #[test]
    fn test_issuer_from_props_overrides_config() {
        let builder = EnvelopeBuilder::new(hs256());
        let token = builder
            .sign_data(json!({"a": 1}), &EnvelopeProps::new().issuer("alice.com"))
            .unwrap();

        let claims = EnvelopeVerifier::new(hs256()).verify(&token).unwrap();
        assert_eq!(claims.issuer(), Some("alice.com"));
        assert!(claims.subject().is_none());
    }

    #[test]
    fn test_missing_issuer_fails_before_signing() {
        let builder = EnvelopeBuilder::new(hs256().without_issuer());
        let err = builder.sign_data(json!({"a": 1}), &EnvelopeProps::new()).unwrap_err();
        assert!(matches!(&err, EnvelopeError::MissingField { field } if field == "issuer"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_reserved_claims_rejected() {
        let builder = EnvelopeBuilder::new(hs256());
        let payload = ClaimSet::new().with(registered::ISSUER, "mallory.com");
        let err = builder.sign_payload(payload, &EnvelopeProps::new()).unwrap_err();
        assert!(matches!(&err, EnvelopeError::ReservedClaim { claim } if claim == "iss"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_builder_config_is_untouched() {
        let config = hs256();
        let builder = EnvelopeBuilder::new(config.clone());
        builder
            .sign_metadata(
                json!({"@type": "md"}),
                &EnvelopeProps::new().subject("http://md/1").issuer("other.com"),
            )
            .unwrap();
        assert_eq!(builder.config(), &config);
    }

    #[test]
    fn test_require_value() {
        assert!(require_value("x", &Value::Null).is_err());
        assert!(require_value("x", &json!("")).is_err());
        assert!(require_value("x", &json!([])).is_ok());
        assert!(require_value("x", &json!("value")).is_ok());
    }

    #[test]
    fn test_verify_graph() {
        let builder = EnvelopeBuilder::new(hs256());
        let verifier = EnvelopeVerifier::new(hs256());

        let token = builder.sign_data(json!({"@graph": []}), &EnvelopeProps::new()).unwrap();
        assert_eq!(verifier.verify_graph(&token).unwrap(), Some(json!({"@graph": []})));

        let ack = builder.sign_message_ack("http://msg/1").unwrap();
        assert_eq!(verifier.verify_graph(&ack).unwrap(), None);
    }
}
