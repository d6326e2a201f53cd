//! Envelope id generation.
//!
//! Subject and subject link envelopes carry a `jwt_id` claim so several
//! envelopes issued for the same subject can be told apart. When the caller
//! does not supply one it is generated from the envelope subject.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fallback envelope ids.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id for an envelope about `subject`.
    fn next_id(&self, subject: &str) -> String;
}

static JWT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// `<subject>-<n>` from a process-wide counter.
///
/// Unique within one process only. Services issuing envelopes for the same
/// subjects from several processes should use [`UuidIdGenerator`] or their
/// own generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterIdGenerator;

impl IdGenerator for CounterIdGenerator {
    fn next_id(&self, subject: &str) -> String {
        let n = JWT_ID_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{subject}-{n}")
    }
}

/// `<subject>-<uuid v4>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self, subject: &str) -> String {
        format!("{subject}-{}", Uuid::new_v4())
    }
}
