//! Audit log correlation
//!
//! Ban and unban events do not say who performed them. The resolver
//! queries the most recent audit entries of the matching action type and
//! attributes the event to the executor of the entry targeting the same
//! user. Only a small window is inspected, so concurrent moderation
//! actions can go unattributed.

use crate::error::Result;
use crate::source::AuditTrail;
use crate::types::{AuditEventType, AuditExecutor, AuditMatch, Snowflake};
use std::sync::Arc;

/// Resolves the actor behind moderation events
#[derive(Clone)]
pub struct AuditResolver {
    trail: Arc<dyn AuditTrail>,
    limit: u8,
}

impl AuditResolver {
    /// Resolver inspecting only the single most recent entry
    pub fn new(trail: Arc<dyn AuditTrail>) -> Self {
        Self::with_limit(trail, 1)
    }

    pub fn with_limit(trail: Arc<dyn AuditTrail>, limit: u8) -> Self {
        Self {
            trail,
            limit: limit.max(1),
        }
    }

    /// Find who performed `event_type` against `subject`
    ///
    /// Returns `Ok(None)` when no recent entry targets the subject or the
    /// executor is not a resolved user. Query errors propagate.
    pub async fn resolve_actor(
        &self,
        subject: Snowflake,
        event_type: AuditEventType,
    ) -> Result<Option<AuditMatch>> {
        let entries = self.trail.fetch_audit_log(event_type, self.limit).await?;

        let actor = entries
            .into_iter()
            .find(|entry| entry.target_id == Some(subject))
            .and_then(|entry| match entry.executor {
                Some(AuditExecutor::User(user)) => Some(AuditMatch {
                    actor_id: user.id,
                    actor_name: user.name,
                }),
                _ => None,
            });

        tracing::debug!(
            subject,
            event_type = %event_type,
            matched = actor.is_some(),
            "Audit correlation finished"
        );

        Ok(actor)
    }

    /// Reason recorded on the user's current ban, if any
    pub async fn ban_reason(&self, user_id: Snowflake) -> Result<Option<String>> {
        let ban = self.trail.fetch_ban(user_id).await?;
        Ok(ban.and_then(|b| b.reason).filter(|r| !r.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::memory::MemoryAuditTrail;
    use crate::types::{AuditEntry, BanRecord, UserRef};

    fn entry(action: AuditEventType, target: Snowflake, executor: Option<AuditExecutor>) -> AuditEntry {
        AuditEntry {
            action,
            target_id: Some(target),
            executor,
            reason: None,
        }
    }

    fn moderator() -> AuditExecutor {
        AuditExecutor::User(UserRef::new(900, "moderator"))
    }

    fn resolver(trail: &Arc<MemoryAuditTrail>) -> AuditResolver {
        AuditResolver::new(trail.clone())
    }

    #[tokio::test]
    async fn test_matching_entry_resolves_actor() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.push_entry(entry(AuditEventType::MemberBanAdd, 42, Some(moderator())));

        let actor = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanAdd)
            .await
            .unwrap();

        assert_eq!(
            actor,
            Some(AuditMatch {
                actor_id: 900,
                actor_name: "moderator".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_no_matching_target() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.push_entry(entry(AuditEventType::MemberBanAdd, 7, Some(moderator())));

        let actor = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanAdd)
            .await
            .unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn test_only_most_recent_entry_inspected() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.push_entry(entry(AuditEventType::MemberBanAdd, 42, Some(moderator())));
        trail.push_entry(entry(AuditEventType::MemberBanAdd, 43, Some(moderator())));

        let actor = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanAdd)
            .await
            .unwrap();
        assert!(actor.is_none());

        let wider = AuditResolver::with_limit(trail.clone(), 5)
            .resolve_actor(42, AuditEventType::MemberBanAdd)
            .await
            .unwrap();
        assert!(wider.is_some());
    }

    #[tokio::test]
    async fn test_unresolved_executor_is_no_match() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.push_entry(entry(
            AuditEventType::MemberBanRemove,
            42,
            Some(AuditExecutor::Unresolved { id: 900 }),
        ));

        let actor = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanRemove)
            .await
            .unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn test_filters_by_action_type() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.push_entry(entry(AuditEventType::MemberBanAdd, 42, Some(moderator())));

        let actor = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanRemove)
            .await
            .unwrap();
        assert!(actor.is_none());
    }

    #[tokio::test]
    async fn test_query_error_propagates() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.fail_next_queries(1);

        let result = resolver(&trail)
            .resolve_actor(42, AuditEventType::MemberBanAdd)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ban_reason() {
        let trail = Arc::new(MemoryAuditTrail::new());
        trail.insert_ban(BanRecord {
            user: UserRef::new(42, "spammer"),
            reason: Some("spam links".to_string()),
        });
        trail.insert_ban(BanRecord {
            user: UserRef::new(43, "quiet"),
            reason: Some(String::new()),
        });

        let resolver = resolver(&trail);
        assert_eq!(
            resolver.ban_reason(42).await.unwrap().as_deref(),
            Some("spam links")
        );
        assert_eq!(resolver.ban_reason(43).await.unwrap(), None);
        assert_eq!(resolver.ban_reason(44).await.unwrap(), None);
    }
}
