//! Notification formatting
//!
//! Pure mapping from a normalized event (plus the resolved moderation
//! actor, if any) to a `NotificationRecord`. Absent values are replaced
//! by placeholder text so every field carries a non-empty string.

use crate::types::{
    mention, AuditMatch, ColorTag, NormalizedEvent, NotificationRecord, Snowflake, ThumbnailTag,
    UserRef,
};
use chrono::{DateTime, Utc};

/// Content could not be read (message evicted from cache)
pub const MISSING_CONTENT: &str = "Er ging wat fout";
/// Content is present but empty (attachment-only messages)
pub const EMPTY_CONTENT: &str = "Geen inhoud";
/// User, actor or timestamp is unknown
pub const UNKNOWN: &str = "Onbekend";
/// Bulk-deleted message without a resolvable author
pub const UNKNOWN_AUTHOR: &str = "Niet bekend";
/// Display name missing from the member snapshot
pub const NAME_NOT_FOUND: &str = "Niet gevonden";
/// Ban without a reason
pub const NO_REASON: &str = "Geen reden opgegeven";

/// Startup notification sent once the source is ready
pub fn format_startup(bot: Option<&UserRef>, latency_ms: i64) -> NotificationRecord {
    NotificationRecord::new("I ben opnieuw opgestart!", ColorTag::Purple, ThumbnailTag::Bot)
        .field("Gebruiker:", user_or_unknown(bot.map(|b| b.id)))
        .field("Ping:", format!("{}ms", latency_ms))
}

/// Map an event to its notification
///
/// `actor` is only consulted for ban and unban events.
pub fn format_event(event: &NormalizedEvent, actor: Option<&AuditMatch>) -> NotificationRecord {
    match event {
        NormalizedEvent::MessageUpdated {
            author_id,
            old_content,
            new_content,
        } => NotificationRecord::new("Bericht bewerkt", ColorTag::Orange, ThumbnailTag::Chat)
            .field("Gebruiker", user_or_unknown(*author_id))
            .field("Oud:", content(old_content.as_deref()))
            .field("Nieuw:", content(new_content.as_deref())),

        NormalizedEvent::MessageDeleted { author_id, content: text } => {
            NotificationRecord::new("Bericht verwijderd", ColorTag::Red, ThumbnailTag::Chat)
                .field("Gebruiker", user_or_unknown(*author_id))
                .field("Bericht:", content(text.as_deref()))
        }

        NormalizedEvent::MessagesBulkDeleted { messages } => messages.iter().fold(
            NotificationRecord::new("Bulk berichten verwijderd", ColorTag::Red, ThumbnailTag::Chat),
            |record, message| {
                let author = non_empty(message.display_name.as_deref()).unwrap_or(UNKNOWN_AUTHOR);
                let text = non_empty(message.content.as_deref()).unwrap_or(EMPTY_CONTENT);
                record.field(format!("Van: {}", author), text)
            },
        ),

        NormalizedEvent::ReactionAdded {
            user_id,
            emoji,
            message,
        } => NotificationRecord::new("Reactie toegevoegd", ColorTag::Green, ThumbnailTag::Reaction)
            .field("Gebruiker:", mention(*user_id))
            .field("Emoji:", emoji.to_string())
            .field("Bericht:", message.url()),

        NormalizedEvent::ReactionRemoved {
            user_id,
            emoji,
            message,
        } => NotificationRecord::new("Reactie verwijderd", ColorTag::Orange, ThumbnailTag::Reaction)
            .field("Gebruiker:", mention(*user_id))
            .field("Emoji:", emoji.to_string())
            .field("Bericht:", message.url()),

        NormalizedEvent::VoiceJoined { member_id, channel } => {
            NotificationRecord::new("Voice kanaal gejoined", ColorTag::Green, ThumbnailTag::Microphone)
                .field("Gebruiker:", mention(*member_id))
                .field("Kanaal:", channel.url())
        }

        NormalizedEvent::VoiceLeft { member_id, channel } => {
            NotificationRecord::new("Voice kanaal verlaten", ColorTag::Orange, ThumbnailTag::Microphone)
                .field("Gebruiker:", mention(*member_id))
                .field("Kanaal:", channel.url())
        }

        NormalizedEvent::VoiceMoved {
            member_id,
            from,
            to,
        } => NotificationRecord::new("Voice kanaal veranderd", ColorTag::Green, ThumbnailTag::Microphone)
            .field("Gebruiker:", mention(*member_id))
            .field("Oud:", from.url())
            .field("Nieuw:", to.url()),

        NormalizedEvent::MemberLeft {
            member_id,
            joined_at,
        } => NotificationRecord::new("Lid verlaten", ColorTag::Red, ThumbnailTag::User)
            .field("Gebruiker:", mention(*member_id))
            .field("Lid sinds:", timestamp(joined_at.as_ref())),

        NormalizedEvent::MemberBanned { user_id, reason } => {
            NotificationRecord::new("Lid gebanned", ColorTag::Red, ThumbnailTag::Moderation)
                .field("Gebruiker:", mention(*user_id))
                .field("Reden:", non_empty(reason.as_deref()).unwrap_or(NO_REASON))
                .field("Door:", actor_or_unknown(actor))
        }

        NormalizedEvent::MemberUnbanned { user_id } => {
            NotificationRecord::new("Lid unbanned", ColorTag::Orange, ThumbnailTag::Moderation)
                .field("Gebruiker:", mention(*user_id))
                .field("Door:", actor_or_unknown(actor))
        }

        NormalizedEvent::MemberRenamed {
            member_id,
            old_name,
            new_name,
        } => NotificationRecord::new("Lid gebruikersnaam update", ColorTag::Green, ThumbnailTag::User)
            .field("Gebruiker:", mention(*member_id))
            .field("Oud:", non_empty(old_name.as_deref()).unwrap_or(NAME_NOT_FOUND))
            .field("Nieuw:", non_empty(new_name.as_deref()).unwrap_or(NAME_NOT_FOUND)),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn content(value: Option<&str>) -> &str {
    match value {
        None => MISSING_CONTENT,
        Some(text) => non_empty(Some(text)).unwrap_or(EMPTY_CONTENT),
    }
}

fn user_or_unknown(id: Option<Snowflake>) -> String {
    id.map(mention).unwrap_or_else(|| UNKNOWN.to_string())
}

fn actor_or_unknown(actor: Option<&AuditMatch>) -> String {
    match actor {
        Some(actor) => format!("{} ({})", actor.actor_name, mention(actor.actor_id)),
        None => UNKNOWN.to_string(),
    }
}

fn timestamp(value: Option<&DateTime<Utc>>) -> String {
    match value {
        Some(at) => format!("<t:{}:F>", at.timestamp()),
        None => UNKNOWN.to_string(),
    }
}
