//! Claim vocabulary for privacy network envelopes.
//!
//! Payload claims live under `https://pn.schema.webshield.io/prop#`, header
//! claims under `http://pn.schema.webshield.io/prop#`, so neither collides with
//! the registered JWT claims (`iss`, `sub`, `iat`, `exp`).
//!
//! These strings are part of the wire format. Already-issued tokens carry them,
//! so an identifier must never be renamed or reused; new claims may be added.

use serde::{Deserialize, Serialize};
use std::fmt;

// ===== Payload claims =====

/// Holds the [`MessageKind`] type id of the envelope.
pub const JWT_TYPE_CLAIM: &str = "https://pn.schema.webshield.io/prop#jwt_type";

/// Distinguishes multiple envelopes issued for the same subject.
pub const JWT_ID_CLAIM: &str = "https://pn.schema.webshield.io/prop#jwt_id";

/// A complete nested token, forwarded by a service for further processing.
pub const EMBEDDED_JWT_MESSAGE_CLAIM: &str =
    "https://pn.schema.webshield.io/prop#embedded_jwt_message_claim";

/// Encrypt key metadata used by a privacy action instance.
pub const ENCRYPT_KEY_MD_CLAIM: &str = "https://pn.schema.webshield.io/prop#encrypt_key_md";

/// An error returned by a service.
pub const ERROR_CLAIM: &str = "https://pn.schema.webshield.io/prop#error";

/// The `@id` of the message being acknowledged.
pub const MESSAGE_ACK_ID_CLAIM: &str = "https://pn.schema.webshield.io/prop#message_ack_id";

/// A JSON-LD metadata node.
pub const METADATA_CLAIM: &str = "https://pn.schema.webshield.io/prop#metadata";

/// A JSON-LD syndicate request node.
pub const SYNDICATE_REQUEST_CLAIM: &str = "https://pn.schema.webshield.io/prop#syndicate_request";

/// A JSON-LD subject link node.
pub const SUBJECT_LINK_CLAIM: &str = "https://pn.schema.webshield.io/prop#subject_link";

/// An array of subject link tokens.
pub const SUBJECT_LINK_JWTS_CLAIM: &str = "https://pn.schema.webshield.io/prop#subject_link_jwts";

/// An array of subject tokens.
pub const SUBJECT_JWTS_CLAIM: &str = "https://pn.schema.webshield.io/prop#subject_jwts";

/// A JSON-LD subject node, or an array of them.
pub const SUBJECT_CLAIM: &str = "https://pn.schema.webshield.io/prop#subject";

/// The `@id` of the syndication operation that produced a subject or subject link.
pub const SYNDICATION_ID_CLAIM: &str = "https://pn.schema.webshield.io/prop#syndication_id";

/// Arbitrary JSON-LD graph data.
pub const PN_GRAPH_CLAIM: &str = "https://pn.schema.webshield.io/prop#pn_graph";

/// The `@id` of the data model describing a subject.
pub const PN_DATA_MODEL_CLAIM: &str = "https://pn.schema.webshield.io/prop#pn_data_model";

/// The privacy pipe `@id`.
pub const PRIVACY_PIPE_CLAIM: &str = "https://pn.schema.webshield.io/prop#privacy_pipe";

/// Metadata to provision into a client during privacy pipe creation.
pub const PROVISION_CLAIM: &str = "https://pn.schema.webshield.io/prop#provision";

/// A query or query result node (the command, not the subject data).
pub const QUERY_CLAIM: &str = "https://pn.schema.webshield.io/prop#query";

/// Private header parameters.
pub mod header {
    /// PEM encoded public key of the signer.
    pub const PUBLIC_KEY_PEM: &str = "http://pn.schema.webshield.io/prop#jwk_pem";

    /// PEM encoded X.509 certificate of the signer.
    pub const X509_CERT_PEM: &str = "http://pn.schema.webshield.io/prop#x5c_pem";
}

/// Registered claims layered on by the signing routine.
pub mod registered {
    pub const ISSUER: &str = "iss";
    pub const SUBJECT: &str = "sub";
    pub const ISSUED_AT: &str = "iat";
    pub const EXPIRES_AT: &str = "exp";
}

/// Which claim combination an envelope carries.
///
/// Serialized as its type id so it can be stored directly under
/// [`JWT_TYPE_CLAIM`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Generic graph data (the v1 envelope format).
    #[serde(rename = "https://pn.schema.webshield.io/type#v1Graph")]
    DataGraph,
    #[serde(rename = "https://pn.schema.webshield.io/type#metadata")]
    Metadata,
    #[serde(rename = "https://pn.schema.webshield.io/type#provision")]
    Provision,
    #[serde(rename = "https://pn.schema.webshield.io/type#encrypt_key_md")]
    EncryptKeyMetadata,
    #[serde(rename = "https://pn.schema.webshield.io/type#subject")]
    Subject,
    #[serde(rename = "https://pn.schema.webshield.io/type#subject_link")]
    SubjectLink,
    #[serde(rename = "https://pn.schema.webshield.io/type#syndicate_request")]
    SyndicateRequest,
    /// Resource service query.
    #[serde(rename = "https://pn.schema.webshield.io/type#rs_query")]
    RsQuery,
    /// Resource service query result.
    #[serde(rename = "https://pn.schema.webshield.io/type#rs_query_result")]
    RsQueryResult,
    /// Resource service proxy query result.
    #[serde(rename = "https://pn.schema.webshield.io/type#rsp_query_result")]
    RspQueryResult,
    #[serde(rename = "https://pn.schema.webshield.io/type#message_ack")]
    MessageAck,
    #[serde(rename = "https://pn.schema.webshield.io/type#error")]
    Error,
}

impl MessageKind {
    /// Every kind, in declaration order.
    pub const ALL: [MessageKind; 12] = [
        Self::DataGraph,
        Self::Metadata,
        Self::Provision,
        Self::EncryptKeyMetadata,
        Self::Subject,
        Self::SubjectLink,
        Self::SyndicateRequest,
        Self::RsQuery,
        Self::RsQueryResult,
        Self::RspQueryResult,
        Self::MessageAck,
        Self::Error,
    ];

    /// The stable type id stored under [`JWT_TYPE_CLAIM`].
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::DataGraph => "https://pn.schema.webshield.io/type#v1Graph",
            Self::Metadata => "https://pn.schema.webshield.io/type#metadata",
            Self::Provision => "https://pn.schema.webshield.io/type#provision",
            Self::EncryptKeyMetadata => "https://pn.schema.webshield.io/type#encrypt_key_md",
            Self::Subject => "https://pn.schema.webshield.io/type#subject",
            Self::SubjectLink => "https://pn.schema.webshield.io/type#subject_link",
            Self::SyndicateRequest => "https://pn.schema.webshield.io/type#syndicate_request",
            Self::RsQuery => "https://pn.schema.webshield.io/type#rs_query",
            Self::RsQueryResult => "https://pn.schema.webshield.io/type#rs_query_result",
            Self::RspQueryResult => "https://pn.schema.webshield.io/type#rsp_query_result",
            Self::MessageAck => "https://pn.schema.webshield.io/type#message_ack",
            Self::Error => "https://pn.schema.webshield.io/type#error",
        }
    }

    /// Look up a kind by its type id.
    pub fn from_type_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_id() == id)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataGraph => write!(f, "DATA_GRAPH"),
            Self::Metadata => write!(f, "METADATA"),
            Self::Provision => write!(f, "PROVISION"),
            Self::EncryptKeyMetadata => write!(f, "ENCRYPT_KEY_MD"),
            Self::Subject => write!(f, "SUBJECT"),
            Self::SubjectLink => write!(f, "SUBJECT_LINK"),
            Self::SyndicateRequest => write!(f, "SYNDICATE_REQUEST"),
            Self::RsQuery => write!(f, "RS_QUERY"),
            Self::RsQueryResult => write!(f, "RS_QUERY_RESULT"),
            Self::RspQueryResult => write!(f, "RSP_QUERY_RESULT"),
            Self::MessageAck => write!(f, "MESSAGE_ACK"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_type_id_lookup() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_type_id(kind.type_id()), Some(kind));
        }
        assert_eq!(MessageKind::from_type_id("https://pn.schema.webshield.io/type#bogus"), None);
    }

    #[test]
    fn test_serde_uses_type_id() {
        let json = serde_json::to_value(MessageKind::SubjectLink).unwrap();
        assert_eq!(json, serde_json::json!("https://pn.schema.webshield.io/type#subject_link"));

        let parsed: MessageKind =
            serde_json::from_value(serde_json::json!("https://pn.schema.webshield.io/type#error"))
                .unwrap();
        assert_eq!(parsed, MessageKind::Error);
    }

    #[test]
    fn test_identifiers_are_distinct() {
        let payload = [
            JWT_TYPE_CLAIM,
            JWT_ID_CLAIM,
            EMBEDDED_JWT_MESSAGE_CLAIM,
            ENCRYPT_KEY_MD_CLAIM,
            ERROR_CLAIM,
            MESSAGE_ACK_ID_CLAIM,
            METADATA_CLAIM,
            SYNDICATE_REQUEST_CLAIM,
            SUBJECT_LINK_CLAIM,
            SUBJECT_LINK_JWTS_CLAIM,
            SUBJECT_JWTS_CLAIM,
            SUBJECT_CLAIM,
            SYNDICATION_ID_CLAIM,
            PN_GRAPH_CLAIM,
            PN_DATA_MODEL_CLAIM,
            PRIVACY_PIPE_CLAIM,
            PROVISION_CLAIM,
            QUERY_CLAIM,
        ];
        let unique: HashSet<_> = payload.iter().collect();
        assert_eq!(unique.len(), payload.len());
        assert!(payload.iter().all(|c| c.starts_with("https://pn.schema.webshield.io/prop#")));

        let types: HashSet<_> = MessageKind::ALL.iter().map(|k| k.type_id()).collect();
        assert_eq!(types.len(), MessageKind::ALL.len());
    }
}
