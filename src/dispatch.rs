//! Event subscription dispatcher
//!
//! Subscribes to every `EventKind` and runs each received event through
//! normalize → correlate → format → deliver in its own supervised task.
//! A failure or panic while handling one event is logged and never
//! affects other events or later events of the same kind.

use crate::format::format_event;
use crate::normalize::normalize;
use crate::resolver::AuditResolver;
use crate::sink::DeliverySink;
use crate::source::{EventSource, Subscription};
use crate::types::{AuditMatch, EventKind, NormalizedEvent, RawEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// First wait after a failed receive
const MIN_BACKOFF: Duration = Duration::from_millis(100);
/// Cap for the receive backoff
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// What became of a handled event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A notification was formatted and handed to the sink
    Delivered,
    /// Filtered out (own action, or nothing changed)
    Skipped,
}

/// Routes raw events from the source to the delivery sink
pub struct Dispatcher {
    source: Arc<dyn EventSource>,
    resolver: AuditResolver,
    sink: DeliverySink,
}

impl Dispatcher {
    pub fn new(source: Arc<dyn EventSource>, resolver: AuditResolver, sink: DeliverySink) -> Self {
        Self {
            source,
            resolver,
            sink,
        }
    }

    /// Subscribe to every event kind and start one listener per kind
    ///
    /// Subscriptions are registered before this returns; nothing waits
    /// for the source to become ready.
    pub fn register(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        EventKind::ALL
            .iter()
            .map(|&kind| {
                let subscription = self.source.subscribe(kind);
                tracing::debug!(kind = %kind, source = self.source.name(), "Subscribed");
                tokio::spawn(Arc::clone(self).listen(kind, subscription))
            })
            .collect()
    }

    /// Receive loop for one kind
    ///
    /// Receive errors back off exponentially from `MIN_BACKOFF` up to
    /// `MAX_BACKOFF`; the next received event resets the backoff.
    async fn listen(self: Arc<Self>, kind: EventKind, mut subscription: Box<dyn Subscription>) {
        let mut backoff = MIN_BACKOFF;
        loop {
            match subscription.next().await {
                Ok(Some(raw)) => {
                    backoff = MIN_BACKOFF;
                    let dispatcher = Arc::clone(&self);
                    supervise(kind, async move {
                        dispatcher.handle(raw).await;
                    });
                }
                Ok(None) => {
                    tracing::info!(kind = %kind, "Subscription closed");
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        kind = %kind,
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "Failed to receive event, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }

    /// Handle one raw event end to end
    pub async fn handle(&self, raw: RawEvent) -> Outcome {
        let kind = raw.kind();
        let self_id = self.source.current_user().map(|user| user.id);

        let Some(event) = normalize(raw, self_id) else {
            tracing::debug!(kind = %kind, "Event skipped");
            return Outcome::Skipped;
        };

        tracing::info!(event = event.label(), "Logging event");

        let event = self.fill_ban_reason(event).await;
        let actor = self.correlate(&event).await;
        let record = format_event(&event, actor.as_ref());
        self.sink.deliver(&record).await;

        Outcome::Delivered
    }

    /// Look up the reason of a ban that arrived without one
    async fn fill_ban_reason(&self, event: NormalizedEvent) -> NormalizedEvent {
        match event {
            NormalizedEvent::MemberBanned {
                user_id,
                reason: None,
            } => {
                let reason = match self.resolver.ban_reason(user_id).await {
                    Ok(reason) => reason,
                    Err(e) => {
                        tracing::warn!(user_id, error = %e, "Failed to fetch ban reason");
                        None
                    }
                };
                NormalizedEvent::MemberBanned { user_id, reason }
            }
            other => other,
        }
    }

    /// Resolve the moderation actor; failures degrade to unknown
    async fn correlate(&self, event: &NormalizedEvent) -> Option<AuditMatch> {
        let (subject, event_type) = event.audit_subject()?;

        match self.resolver.resolve_actor(subject, event_type).await {
            Ok(actor) => actor,
            Err(e) => {
                tracing::warn!(
                    subject,
                    event_type = %event_type,
                    error = %e,
                    "Audit correlation failed"
                );
                None
            }
        }
    }
}

/// Run `task` in its own tokio task, logging a panic instead of propagating it
pub fn supervise<F>(kind: EventKind, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let inner = tokio::spawn(task);
    tokio::spawn(async move {
        if let Err(e) = inner.await {
            if e.is_panic() {
                tracing::error!(kind = %kind, error = %e, "Event handler panicked");
            } else {
                tracing::warn!(kind = %kind, error = %e, "Event handler cancelled");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AuditLogError, Result};
    use crate::sink::memory::MemoryChannel;
    use crate::source::memory::{MemoryAuditTrail, MemorySource};
    use crate::types::{
        AuditEntry, AuditEventType, AuditExecutor, BanRecord, Emoji, MemberRecord, MessageRef,
        MessageSnapshot, ReactionRecord, UserRef,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const BOT: u64 = 1;
    const ALICE: u64 = 2;
    const MODERATOR: u64 = 900;

    struct Harness {
        source: Arc<MemorySource>,
        trail: Arc<MemoryAuditTrail>,
        channel: Arc<MemoryChannel>,
        dispatcher: Arc<Dispatcher>,
    }

    fn harness() -> Harness {
        let source = Arc::new(MemorySource::ready_as(UserRef::new(BOT, "auditbot"), 20));
        let trail = Arc::new(MemoryAuditTrail::new());
        let channel = Arc::new(MemoryChannel::new());
        let dispatcher = Arc::new(Dispatcher::new(
            source.clone(),
            AuditResolver::new(trail.clone()),
            DeliverySink::new(channel.clone(), "media"),
        ));
        Harness {
            source,
            trail,
            channel,
            dispatcher,
        }
    }

    fn ban(user: u64, reason: Option<&str>) -> BanRecord {
        BanRecord {
            user: UserRef::new(user, "alice"),
            reason: reason.map(str::to_string),
        }
    }

    fn reaction(user: u64) -> RawEvent {
        RawEvent::ReactionAdded {
            reaction: ReactionRecord {
                user: UserRef::new(user, "someone"),
                emoji: Emoji::Unicode {
                    value: "👍".to_string(),
                },
                message: MessageRef {
                    guild_id: Some(10),
                    channel_id: 20,
                    message_id: 30,
                },
            },
        }
    }

    fn deleted_by(author: u64) -> RawEvent {
        RawEvent::MessageDeleted {
            message: MessageSnapshot {
                location: MessageRef {
                    guild_id: Some(10),
                    channel_id: 20,
                    message_id: 31,
                },
                author: Some(UserRef::new(author, "someone")),
                member_display_name: None,
                content: Some("hoi".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_self_events_produce_no_delivery() {
        let h = harness();

        assert_eq!(h.dispatcher.handle(reaction(BOT)).await, Outcome::Skipped);
        assert_eq!(h.dispatcher.handle(deleted_by(BOT)).await, Outcome::Skipped);
        assert_eq!(h.channel.attempts(), 0);

        assert_eq!(h.dispatcher.handle(reaction(ALICE)).await, Outcome::Delivered);
        assert_eq!(h.channel.attempts(), 1);
    }

    #[tokio::test]
    async fn test_ban_attributed_to_moderator() {
        let h = harness();
        h.trail.push_entry(AuditEntry {
            action: AuditEventType::MemberBanAdd,
            target_id: Some(ALICE),
            executor: Some(AuditExecutor::User(UserRef::new(MODERATOR, "mod"))),
            reason: None,
        });

        h.dispatcher
            .handle(RawEvent::MemberBanned {
                ban: ban(ALICE, Some("spam")),
            })
            .await;

        let records = h.channel.records().await;
        assert_eq!(records[0].value_of("Door:"), Some("mod (<@900>)"));
        assert_eq!(records[0].value_of("Reden:"), Some("spam"));
        assert_eq!(h.trail.query_count(), 1);
    }

    #[tokio::test]
    async fn test_ban_reason_fetched_when_missing() {
        let h = harness();
        h.trail.insert_ban(ban(ALICE, Some("raid")));

        h.dispatcher
            .handle(RawEvent::MemberBanned { ban: ban(ALICE, None) })
            .await;

        let records = h.channel.records().await;
        assert_eq!(records[0].value_of("Reden:"), Some("raid"));
        assert_eq!(records[0].value_of("Door:"), Some("Onbekend"));
    }

    #[tokio::test]
    async fn test_reasonless_ban_with_failed_correlation() {
        let h = harness();
        h.trail.insert_ban(ban(ALICE, Some("raid")));
        h.trail.push_entry(AuditEntry {
            action: AuditEventType::MemberBanAdd,
            target_id: Some(ALICE),
            executor: Some(AuditExecutor::User(UserRef::new(MODERATOR, "mod"))),
            reason: None,
        });
        h.trail.fail_next_queries(1);

        let outcome = h
            .dispatcher
            .handle(RawEvent::MemberBanned { ban: ban(ALICE, None) })
            .await;

        assert_eq!(outcome, Outcome::Delivered);
        let records = h.channel.records().await;
        assert_eq!(records[0].value_of("Reden:"), Some("raid"));
        assert_eq!(records[0].value_of("Door:"), Some("Onbekend"));
        assert_eq!(h.trail.query_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_ban_lookup_keeps_correlation() {
        let h = harness();
        h.trail.push_entry(AuditEntry {
            action: AuditEventType::MemberBanAdd,
            target_id: Some(ALICE),
            executor: Some(AuditExecutor::User(UserRef::new(MODERATOR, "mod"))),
            reason: None,
        });
        h.trail.fail_next_bans(1);

        h.dispatcher
            .handle(RawEvent::MemberBanned { ban: ban(ALICE, None) })
            .await;

        let records = h.channel.records().await;
        assert_eq!(records[0].value_of("Reden:"), Some("Geen reden opgegeven"));
        assert_eq!(records[0].value_of("Door:"), Some("mod (<@900>)"));
    }

    #[tokio::test]
    async fn test_correlation_failure_degrades_to_unknown() {
        let h = harness();
        h.trail.fail_next_queries(1);

        let outcome = h
            .dispatcher
            .handle(RawEvent::MemberUnbanned { ban: ban(ALICE, None) })
            .await;

        assert_eq!(outcome, Outcome::Delivered);
        let records = h.channel.records().await;
        assert_eq!(records[0].title, "Lid unbanned");
        assert_eq!(records[0].value_of("Door:"), Some("Onbekend"));
    }

    #[tokio::test]
    async fn test_unban_correlates_ban_remove_entries() {
        let h = harness();
        h.trail.push_entry(AuditEntry {
            action: AuditEventType::MemberBanRemove,
            target_id: Some(ALICE),
            executor: Some(AuditExecutor::User(UserRef::new(MODERATOR, "mod"))),
            reason: None,
        });

        h.dispatcher
            .handle(RawEvent::MemberUnbanned { ban: ban(ALICE, None) })
            .await;

        let records = h.channel.records().await;
        assert_eq!(records[0].value_of("Door:"), Some("mod (<@900>)"));
    }

    #[tokio::test]
    async fn test_non_moderation_events_skip_audit_trail() {
        let h = harness();

        h.dispatcher
            .handle(RawEvent::MemberLeft {
                member: MemberRecord {
                    user: UserRef::new(ALICE, "alice"),
                    display_name: None,
                    joined_at: None,
                },
            })
            .await;

        assert_eq!(h.trail.query_count(), 0);
        assert_eq!(h.channel.attempts(), 1);
    }

    #[tokio::test]
    async fn test_registered_listeners_route_events() {
        let h = harness();
        let handles = h.dispatcher.register();
        assert_eq!(handles.len(), EventKind::ALL.len());

        h.source.emit(reaction(ALICE));
        h.source.emit(deleted_by(ALICE));

        h.channel
            .wait_for_attempts(2, Duration::from_secs(5))
            .await
            .unwrap();

        let mut titles: Vec<String> = h
            .channel
            .records()
            .await
            .into_iter()
            .map(|r| r.title)
            .collect();
        titles.sort();
        assert_eq!(titles, vec!["Bericht verwijderd", "Reactie toegevoegd"]);

        for handle in handles {
            handle.abort();
        }
    }

    /// Source whose subscriptions fail on every receive, except for `healthy`
    struct BrokenSource {
        inner: MemorySource,
        healthy: Option<EventKind>,
        receives: Arc<AtomicUsize>,
    }

    struct BrokenSubscription {
        receives: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Subscription for BrokenSubscription {
        async fn next(&mut self) -> Result<Option<RawEvent>> {
            self.receives.fetch_add(1, Ordering::SeqCst);
            Err(AuditLogError::Source("gateway unavailable".to_string()))
        }
    }

    impl EventSource for BrokenSource {
        fn subscribe(&self, kind: EventKind) -> Box<dyn Subscription> {
            if self.healthy == Some(kind) {
                return self.inner.subscribe(kind);
            }
            Box::new(BrokenSubscription {
                receives: self.receives.clone(),
            })
        }

        fn latency(&self) -> i64 {
            self.inner.latency()
        }

        fn current_user(&self) -> Option<UserRef> {
            self.inner.current_user()
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn broken_dispatcher(
        healthy: Option<EventKind>,
    ) -> (Arc<BrokenSource>, Arc<MemoryChannel>, Arc<Dispatcher>) {
        let source = Arc::new(BrokenSource {
            inner: MemorySource::ready_as(UserRef::new(BOT, "auditbot"), 20),
            healthy,
            receives: Arc::new(AtomicUsize::new(0)),
        });
        let channel = Arc::new(MemoryChannel::new());
        let dispatcher = Arc::new(Dispatcher::new(
            source.clone(),
            AuditResolver::new(Arc::new(MemoryAuditTrail::new())),
            DeliverySink::new(channel.clone(), "media"),
        ));
        (source, channel, dispatcher)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_subscriptions_do_not_starve_other_kinds() {
        let (source, channel, dispatcher) = broken_dispatcher(Some(EventKind::ReactionAdded));
        let handles = dispatcher.register();

        source.inner.emit(reaction(ALICE));
        channel
            .wait_for_attempts(1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(channel.records().await[0].title, "Reactie toegevoegd");

        // Nine failing listeners, each backing off from 100ms.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(source.receives.load(Ordering::SeqCst) < 100);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_errors_back_off_exponentially() {
        let (source, _channel, dispatcher) = broken_dispatcher(None);
        let handles = dispatcher.register();
        let listeners = handles.len();

        // Receives at 0, 100, 300 and 700ms.
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let receives = source.receives.load(Ordering::SeqCst);
        assert!(receives >= 3 * listeners && receives <= 5 * listeners);

        // Then 1.5s, 3.1s and 6.3s.
        tokio::time::sleep(Duration::from_millis(9000)).await;
        let receives = source.receives.load(Ordering::SeqCst);
        assert!(receives >= 6 * listeners && receives <= 8 * listeners);

        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_supervise_contains_panics() {
        let handle = supervise(EventKind::MemberLeft, async {
            panic!("handler blew up");
        });

        // The supervisor itself completes normally.
        assert!(handle.await.is_ok());
    }
}
