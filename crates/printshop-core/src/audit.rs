//! # Audit Records
//!
//! The shape of an audit trail entry and the message handed to the writer.
//! Persistence lives in `printshop-db`; this module only builds values.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler                                                                │
//! │     │  business write commits                                          │
//! │     ▼                                                                   │
//! │  AuditEvent::new(entity_type, id, action)                              │
//! │     .old_value(&before)      ── AuditSnapshot (any Serialize) ──┐      │
//! │     .new_value(&after)                                          │      │
//! │     .actor(..).context(..)                                      │      │
//! │     │                                          snapshot failure │      │
//! │     ▼                                          kept on the event│      │
//! │  AuditLogWriter::record(event)   ◄──────────────────────────────┘      │
//! │     └── own transaction; any failure is logged and dropped             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuditError;

// =============================================================================
// Action
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    PaymentRecorded,
}

impl AuditAction {
    /// One-line change summary. Derived from the action alone.
    pub const fn summary(&self) -> &'static str {
        match self {
            AuditAction::Create => "Entity created",
            AuditAction::Update => "Entity updated",
            AuditAction::Delete => "Entity deleted",
            AuditAction::PaymentRecorded => "Payment recorded for print job",
        }
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Anything that can be frozen into the textual before/after state of an
/// audit record.
pub trait AuditSnapshot {
    fn to_audit_snapshot(&self) -> Result<String, AuditError>;
}

impl<T: Serialize + ?Sized> AuditSnapshot for T {
    fn to_audit_snapshot(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string(self)?)
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// HTTP metadata of the request that caused a mutation. Empty when the
/// writer is driven from outside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(
        forwarded_for: Option<&str>,
        peer: Option<&str>,
        user_agent: Option<&str>,
    ) -> Self {
        Self {
            ip_address: client_ip(forwarded_for, peer),
            user_agent: user_agent
                .map(str::trim)
                .filter(|ua| !ua.is_empty())
                .map(str::to_string),
        }
    }
}

/// First `X-Forwarded-For` entry when present, otherwise the peer address.
pub fn client_ip(forwarded_for: Option<&str>, peer: Option<&str>) -> Option<String> {
    forwarded_for
        .and_then(|header| header.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or(peer)
        .map(str::to_string)
}

// =============================================================================
// Event
// =============================================================================

/// One mutation, ready for the audit writer.
///
/// Snapshots are serialized when attached. A failure is kept on the event
/// so the writer can log it and drop the record without the caller ever
/// handling it.
#[derive(Debug)]
pub struct AuditEvent {
    pub entity_type: String,
    pub entity_id: i64,
    pub action: AuditAction,
    pub actor: Option<String>,
    pub context: RequestContext,
    pub print_job_id: Option<i64>,
    pub customer_name: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    failure: Option<AuditError>,
}

impl AuditEvent {
    pub fn new(entity_type: impl Into<String>, entity_id: i64, action: AuditAction) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            action,
            actor: None,
            context: RequestContext::default(),
            print_job_id: None,
            customer_name: None,
            old_value: None,
            new_value: None,
            failure: None,
        }
    }

    pub fn old_value<T: AuditSnapshot + ?Sized>(mut self, value: &T) -> Self {
        self.old_value = self.capture(value);
        self
    }

    pub fn new_value<T: AuditSnapshot + ?Sized>(mut self, value: &T) -> Self {
        self.new_value = self.capture(value);
        self
    }

    pub fn actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    /// Links the record to a print job, for entity types that are jobs.
    pub fn print_job(mut self, print_job_id: i64, customer_name: Option<String>) -> Self {
        self.print_job_id = Some(print_job_id);
        self.customer_name = customer_name;
        self
    }

    fn capture<T: AuditSnapshot + ?Sized>(&mut self, value: &T) -> Option<String> {
        match value.to_audit_snapshot() {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                self.failure.get_or_insert(err);
                None
            }
        }
    }

    pub fn snapshot_failure(&self) -> Option<&AuditError> {
        self.failure.as_ref()
    }

    pub fn old_snapshot(&self) -> Option<&str> {
        self.old_value.as_deref()
    }

    pub fn new_snapshot(&self) -> Option<&str> {
        self.new_value.as_deref()
    }

    pub fn summary(&self) -> &'static str {
        self.action.summary()
    }
}

// =============================================================================
// Stored Record
// =============================================================================

/// An immutable audit trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLog {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
    /// Actor identity: a numeric user id or a username.
    pub user_id: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub changes: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub print_job_id: Option<i64>,
    pub customer_name: Option<String>,
    /// Resolved from `user_id` on read.
    #[cfg_attr(feature = "sqlx", sqlx(default))]
    pub user_name: Option<String>,
}

/// Search criteria. `None` means "don't filter".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serializer;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to serialize"))
        }
    }

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        assert_eq!(
            client_ip(Some(" 203.0.113.7 , 10.0.0.1"), Some("127.0.0.1")),
            Some("203.0.113.7".to_string())
        );
        assert_eq!(client_ip(Some(""), Some("127.0.0.1")), Some("127.0.0.1".to_string()));
        assert_eq!(client_ip(None, None), None);
    }

    #[test]
    fn test_event_snapshots() {
        #[derive(Serialize)]
        struct Thing {
            name: &'static str,
        }

        let event = AuditEvent::new("Customer", 7, AuditAction::Create)
            .new_value(&Thing { name: "Ada" })
            .actor(Some("3".to_string()));
        assert_eq!(event.old_snapshot(), None);
        assert_eq!(event.new_snapshot(), Some(r#"{"name":"Ada"}"#));
        assert_eq!(event.summary(), "Entity created");
        assert!(event.snapshot_failure().is_none());
    }

    #[test]
    fn test_snapshot_failure_is_captured_not_raised() {
        let event = AuditEvent::new("Customer", 7, AuditAction::Delete).old_value(&Unserializable);
        assert!(event.old_snapshot().is_none());
        assert!(matches!(
            event.snapshot_failure(),
            Some(AuditError::Serialization(_))
        ));
    }

    #[test]
    fn test_request_context_drops_blank_user_agent() {
        let ctx = RequestContext::new(None, Some("10.1.1.1"), Some("  "));
        assert_eq!(ctx.ip_address.as_deref(), Some("10.1.1.1"));
        assert_eq!(ctx.user_agent, None);
    }
}
