//! Event source traits — the seam to the platform connection
//!
//! The gateway/session layer lives outside this crate. It is consumed
//! through `EventSource` (subscribe by kind, health signal, own identity)
//! and `AuditTrail` (moderation lookups). `memory` provides an in-process
//! implementation of both for tests and single-process use.

use crate::error::Result;
use crate::types::{AuditEntry, AuditEventType, BanRecord, EventKind, RawEvent, Snowflake, UserRef};
use async_trait::async_trait;

pub mod memory;

/// Live stream of platform events
pub trait EventSource: Send + Sync {
    /// Subscribe to one event kind
    ///
    /// Registration is synchronous; events flow once the source is ready.
    fn subscribe(&self, kind: EventKind) -> Box<dyn Subscription>;

    /// Gateway latency in milliseconds, negative until connected
    fn latency(&self) -> i64;

    /// The bot's own account, once known
    fn current_user(&self) -> Option<UserRef>;

    /// Source name (e.g., "gateway", "memory")
    fn name(&self) -> &str;
}

/// Async handle yielding raw events of one kind
#[async_trait]
pub trait Subscription: Send {
    /// Receive the next event, `None` once the source has closed
    async fn next(&mut self) -> Result<Option<RawEvent>>;
}

/// Queryable log of administrative actions
#[async_trait]
pub trait AuditTrail: Send + Sync {
    /// Most recent entries of one action type, newest first
    async fn fetch_audit_log(
        &self,
        event_type: AuditEventType,
        limit: u8,
    ) -> Result<Vec<AuditEntry>>;

    /// Current ban record of a user, if banned
    async fn fetch_ban(&self, user_id: Snowflake) -> Result<Option<BanRecord>>;
}
