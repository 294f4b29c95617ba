//! In-memory event source and audit trail
//!
//! Events emitted through `MemorySource::emit` are fanned out to every
//! subscription of the matching kind over a tokio broadcast channel.
//! `MemoryAuditTrail` keeps entries newest-first and can be told to fail
//! queries, which makes correlation fallbacks testable.

use super::{AuditTrail, EventSource, Subscription};
use crate::error::{AuditLogError, Result};
use crate::types::{AuditEntry, AuditEventType, BanRecord, EventKind, RawEvent, Snowflake, UserRef};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::RwLock;
use tokio::sync::broadcast;

/// Memory source configuration
#[derive(Debug, Clone)]
pub struct MemorySourceConfig {
    /// Broadcast buffer per subscriber before lagging
    pub channel_capacity: usize,
}

impl Default for MemorySourceConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

/// In-process event source
pub struct MemorySource {
    sender: broadcast::Sender<RawEvent>,
    latency: AtomicI64,
    current_user: RwLock<Option<UserRef>>,
}

impl MemorySource {
    pub fn new(config: MemorySourceConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            sender,
            latency: AtomicI64::new(-1),
            current_user: RwLock::new(None),
        }
    }

    /// A source that is already connected as `user`
    pub fn ready_as(user: UserRef, latency: i64) -> Self {
        let source = Self::default();
        source.set_current_user(user);
        source.set_latency(latency);
        source
    }

    /// Deliver an event to all subscriptions of its kind
    ///
    /// Returns the number of live subscriptions that received it.
    pub fn emit(&self, event: RawEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::debug!(kind = %kind, receivers, "Event emitted");
                receivers
            }
            Err(_) => {
                tracing::debug!(kind = %kind, "Event emitted with no subscribers");
                0
            }
        }
    }

    pub fn set_latency(&self, latency: i64) {
        self.latency.store(latency, Ordering::SeqCst);
    }

    pub fn set_current_user(&self, user: UserRef) {
        if let Ok(mut current) = self.current_user.write() {
            *current = Some(user);
        }
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new(MemorySourceConfig::default())
    }
}

impl EventSource for MemorySource {
    fn subscribe(&self, kind: EventKind) -> Box<dyn Subscription> {
        Box::new(MemorySubscription {
            kind,
            receiver: self.sender.subscribe(),
        })
    }

    fn latency(&self) -> i64 {
        self.latency.load(Ordering::SeqCst)
    }

    fn current_user(&self) -> Option<UserRef> {
        self.current_user.read().ok().and_then(|u| u.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Subscription to one kind on a `MemorySource`
pub struct MemorySubscription {
    kind: EventKind,
    receiver: broadcast::Receiver<RawEvent>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    async fn next(&mut self) -> Result<Option<RawEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.kind() == self.kind => return Ok(Some(event)),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(kind = %self.kind, skipped, "Subscription lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(None),
            }
        }
    }
}

/// In-memory audit trail
#[derive(Default)]
pub struct MemoryAuditTrail {
    /// Newest first
    entries: RwLock<Vec<AuditEntry>>,
    bans: RwLock<HashMap<Snowflake, BanRecord>>,
    query_failures: AtomicUsize,
    ban_failures: AtomicUsize,
    queries: AtomicUsize,
}

impl MemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action as the newest entry
    pub fn push_entry(&self, entry: AuditEntry) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(0, entry);
        }
    }

    pub fn insert_ban(&self, ban: BanRecord) {
        if let Ok(mut bans) = self.bans.write() {
            bans.insert(ban.user.id, ban);
        }
    }

    /// Make the next `count` audit log queries fail
    pub fn fail_next_queries(&self, count: usize) {
        self.query_failures.store(count, Ordering::SeqCst);
    }

    /// Make the next `count` ban lookups fail
    pub fn fail_next_bans(&self, count: usize) {
        self.ban_failures.store(count, Ordering::SeqCst);
    }

    /// Number of audit log queries issued so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl AuditTrail for MemoryAuditTrail {
    async fn fetch_audit_log(
        &self,
        event_type: AuditEventType,
        limit: u8,
    ) -> Result<Vec<AuditEntry>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.query_failures) {
            return Err(AuditLogError::AuditQuery {
                event_type: event_type.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let entries = self.entries.read().map_err(|e| AuditLogError::AuditQuery {
            event_type: event_type.to_string(),
            reason: format!("Failed to acquire audit lock: {}", e),
        })?;

        Ok(entries
            .iter()
            .filter(|entry| entry.action == event_type)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn fetch_ban(&self, user_id: Snowflake) -> Result<Option<BanRecord>> {
        if take_failure(&self.ban_failures) {
            return Err(AuditLogError::AuditQuery {
                event_type: "ban".to_string(),
                reason: "injected failure".to_string(),
            });
        }

        let bans = self.bans.read().map_err(|e| AuditLogError::AuditQuery {
            event_type: "ban".to_string(),
            reason: format!("Failed to acquire ban lock: {}", e),
        })?;
        Ok(bans.get(&user_id).cloned())
    }
}
