//! Raw event normalization
//!
//! Reduces each `RawEvent` to the `NormalizedEvent` its notification
//! needs, or `None` when the event must not produce one:
//!
//! - events originating from the bot itself (messages, reactions)
//! - message updates that did not change the content
//! - voice updates that did not change the channel
//! - member updates that did not change the display name

use crate::types::{
    DeletedMessage, MemberRecord, MessageSnapshot, NormalizedEvent, RawEvent, ReactionRecord,
    Snowflake, VoiceState,
};

/// Normalize a raw event; `self_id` is the bot's own id when known
pub fn normalize(raw: RawEvent, self_id: Option<Snowflake>) -> Option<NormalizedEvent> {
    let is_self = |id: Snowflake| self_id == Some(id);

    match raw {
        RawEvent::MessageUpdated { old, new } => message_updated(old, new, is_self),
        RawEvent::MessageDeleted { message } => {
            let author_id = message.author.as_ref().map(|a| a.id);
            if author_id.is_some_and(is_self) {
                return None;
            }
            Some(NormalizedEvent::MessageDeleted {
                author_id,
                content: message.content,
            })
        }
        RawEvent::MessagesBulkDeleted { messages } => Some(NormalizedEvent::MessagesBulkDeleted {
            messages: messages.into_iter().map(deleted_message).collect(),
        }),
        RawEvent::ReactionAdded { reaction } => {
            if is_self(reaction.user.id) {
                return None;
            }
            let ReactionRecord {
                user,
                emoji,
                message,
            } = reaction;
            Some(NormalizedEvent::ReactionAdded {
                user_id: user.id,
                emoji,
                message,
            })
        }
        RawEvent::ReactionRemoved { reaction } => {
            if is_self(reaction.user.id) {
                return None;
            }
            let ReactionRecord {
                user,
                emoji,
                message,
            } = reaction;
            Some(NormalizedEvent::ReactionRemoved {
                user_id: user.id,
                emoji,
                message,
            })
        }
        RawEvent::VoiceStateUpdated { old, new } => voice_transition(old, new),
        RawEvent::MemberLeft { member } => Some(NormalizedEvent::MemberLeft {
            member_id: member.user.id,
            joined_at: member.joined_at,
        }),
        RawEvent::MemberBanned { ban } => Some(NormalizedEvent::MemberBanned {
            user_id: ban.user.id,
            reason: ban.reason,
        }),
        RawEvent::MemberUnbanned { ban } => Some(NormalizedEvent::MemberUnbanned {
            user_id: ban.user.id,
        }),
        RawEvent::MemberUpdated { old, new } => member_renamed(old, new),
    }
}

fn message_updated(
    old: MessageSnapshot,
    new: MessageSnapshot,
    is_self: impl Fn(Snowflake) -> bool,
) -> Option<NormalizedEvent> {
    // Fall back to the old snapshot's author for partial updates.
    let author_id = new.author.as_ref().or(old.author.as_ref()).map(|a| a.id);
    if author_id.is_some_and(is_self) {
        return None;
    }

    // Embed resolution and pin changes fire updates with identical content.
    if old.content.is_some() && old.content == new.content {
        return None;
    }

    Some(NormalizedEvent::MessageUpdated {
        author_id,
        old_content: old.content,
        new_content: new.content,
    })
}

fn deleted_message(message: MessageSnapshot) -> DeletedMessage {
    let display_name = message
        .member_display_name
        .filter(|name| !name.is_empty())
        .or_else(|| message.author.map(|a| a.name).filter(|name| !name.is_empty()));

    DeletedMessage {
        display_name,
        content: message.content,
    }
}

fn voice_transition(old: VoiceState, new: VoiceState) -> Option<NormalizedEvent> {
    let member_id = new.user_id;
    match (old.channel, new.channel) {
        (None, Some(channel)) => Some(NormalizedEvent::VoiceJoined { member_id, channel }),
        (Some(channel), None) => Some(NormalizedEvent::VoiceLeft {
            member_id: old.user_id,
            channel,
        }),
        (Some(from), Some(to)) if from != to => Some(NormalizedEvent::VoiceMoved {
            member_id,
            from,
            to,
        }),
        // mute, deafen and stream toggles
        _ => None,
    }
}

fn member_renamed(old: MemberRecord, new: MemberRecord) -> Option<NormalizedEvent> {
    if old.display_name == new.display_name {
        return None;
    }

    Some(NormalizedEvent::MemberRenamed {
        member_id: new.user.id,
        old_name: old.display_name,
        new_name: new.display_name,
    })
}
