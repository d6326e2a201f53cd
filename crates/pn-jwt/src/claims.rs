//! Claim sets and per-envelope properties.

use chrono::Duration;
use pn_core::MessageKind;
use pn_core::claims::{
    JWT_ID_CLAIM, JWT_TYPE_CLAIM, PN_GRAPH_CLAIM, PRIVACY_PIPE_CLAIM, registered,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EnvelopeError;

/// Ordered mapping from claim identifier to value.
///
/// Built fresh for every envelope and recovered by decoding or verifying one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Start a claim set tagged with `kind`.
    pub fn for_kind(kind: MessageKind) -> Self {
        Self::new().with(JWT_TYPE_CLAIM, kind.type_id())
    }

    /// Add a claim, builder style.
    pub fn with(mut self, claim: &str, value: impl Into<Value>) -> Self {
        self.insert(claim, value);
        self
    }

    /// Add a claim, returning the previous value if any.
    pub fn insert(&mut self, claim: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(claim.to_string(), value.into())
    }

    pub fn get(&self, claim: &str) -> Option<&Value> {
        self.0.get(claim)
    }

    /// Get a claim holding a string.
    pub fn get_str(&self, claim: &str) -> Option<&str> {
        self.0.get(claim).and_then(Value::as_str)
    }

    pub fn contains(&self, claim: &str) -> bool {
        self.0.contains_key(claim)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// The message kind tag, if present and recognised.
    pub fn kind(&self) -> Option<MessageKind> {
        self.get_str(JWT_TYPE_CLAIM).and_then(MessageKind::from_type_id)
    }

    pub fn issuer(&self) -> Option<&str> {
        self.get_str(registered::ISSUER)
    }

    pub fn subject(&self) -> Option<&str> {
        self.get_str(registered::SUBJECT)
    }

    pub fn issued_at(&self) -> Option<i64> {
        self.get(registered::ISSUED_AT).and_then(Value::as_i64)
    }

    /// `exp` in whole seconds. Fractional values are rounded down.
    pub fn expires_at(&self) -> Option<i64> {
        let exp = self.get(registered::EXPIRES_AT)?;
        exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs.floor() as i64))
    }

    pub fn jwt_id(&self) -> Option<&str> {
        self.get_str(JWT_ID_CLAIM)
    }

    /// The graph data claim. Absent rather than an error when missing.
    pub fn graph(&self) -> Option<&Value> {
        self.get(PN_GRAPH_CLAIM)
    }

    /// The privacy pipe id claim. Absent rather than an error when missing.
    pub fn privacy_pipe(&self) -> Option<&str> {
        self.get_str(PRIVACY_PIPE_CLAIM)
    }
}

impl From<Map<String, Value>> for ClaimSet {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Cross-cutting overrides for a single envelope.
///
/// Which fields are required depends on the message kind; each
/// constructor on [`EnvelopeBuilder`](crate::EnvelopeBuilder) checks its own.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeProps {
    /// The `sub` claim. Required by every kind except data graphs.
    pub subject: Option<String>,

    /// Overrides the configured issuer.
    pub issuer: Option<String>,

    /// Privacy pipe `@id`.
    pub privacy_pipe: Option<String>,

    /// Provision node added to metadata envelopes.
    pub provision: Option<Value>,

    /// Explicit `jwt_id` for subject and subject link envelopes.
    pub jwt_id: Option<String>,

    /// Adds an `exp` claim this far after signing.
    pub expires_in: Option<Duration>,
}

impl EnvelopeProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn privacy_pipe(mut self, privacy_pipe: impl Into<String>) -> Self {
        self.privacy_pipe = Some(privacy_pipe.into());
        self
    }

    pub fn provision(mut self, provision: impl Into<Value>) -> Self {
        self.provision = Some(provision.into());
        self
    }

    pub fn jwt_id(mut self, jwt_id: impl Into<String>) -> Self {
        self.jwt_id = Some(jwt_id.into());
        self
    }

    pub fn expires_in(mut self, duration: Duration) -> Self {
        self.expires_in = Some(duration);
        self
    }

    pub(crate) fn require_subject(&self) -> Result<&str, EnvelopeError> {
        non_empty(self.subject.as_deref()).ok_or_else(|| EnvelopeError::missing("subject"))
    }

    pub(crate) fn require_privacy_pipe(&self) -> Result<&str, EnvelopeError> {
        non_empty(self.privacy_pipe.as_deref())
            .ok_or_else(|| EnvelopeError::missing("privacy_pipe"))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
