//! Core types for the audit log pipeline
//!
//! Raw events arrive from an `EventSource` as owned snapshots, are
//! normalized into `NormalizedEvent`, and leave the pipeline as a
//! `NotificationRecord`. All serializable types use camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Platform identifier (user, guild, channel, message, emoji)
pub type Snowflake = u64;

/// Base URL for message and channel links
const CHANNEL_URL_BASE: &str = "https://discord.com/channels";

/// A user as seen by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Snowflake,

    /// Username (or legacy tag) of the account
    pub name: String,
}

impl UserRef {
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Mention markup for this user
    pub fn mention(&self) -> String {
        mention(self.id)
    }
}

/// Mention markup for a user id (`<@id>`)
pub fn mention(id: Snowflake) -> String {
    format!("<@{}>", id)
}

/// Locates a channel inside a guild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub guild_id: Snowflake,
    pub channel_id: Snowflake,
}

impl ChannelRef {
    pub fn new(guild_id: Snowflake, channel_id: Snowflake) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }

    /// Jump URL for the channel
    pub fn url(&self) -> String {
        format!("{}/{}/{}", CHANNEL_URL_BASE, self.guild_id, self.channel_id)
    }
}

/// Locates a message; `guild_id` is `None` for direct messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
}

impl MessageRef {
    /// Jump URL for the message
    pub fn url(&self) -> String {
        let guild = self
            .guild_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "@me".to_string());
        format!(
            "{}/{}/{}/{}",
            CHANNEL_URL_BASE, guild, self.channel_id, self.message_id
        )
    }
}

/// Reaction emoji
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum Emoji {
    /// Plain unicode emoji (e.g. "👍")
    Unicode { value: String },
    /// Guild emoji, rendered with its markup
    Custom {
        name: String,
        id: Snowflake,
        #[serde(default)]
        animated: bool,
    },
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emoji::Unicode { value } => write!(f, "{}", value),
            Emoji::Custom {
                name,
                id,
                animated: true,
            } => write!(f, "<a:{}:{}>", name, id),
            Emoji::Custom { name, id, .. } => write!(f, "<:{}:{}>", name, id),
        }
    }
}

// ─── Raw events ──────────────────────────────────────────────────

/// Snapshot of a message
///
/// Anything but the locator may be missing when the message was
/// evicted from the source's cache before the event fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSnapshot {
    pub location: MessageRef,

    #[serde(default)]
    pub author: Option<UserRef>,

    /// Display name of the author's guild membership, if cached
    #[serde(default)]
    pub member_display_name: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

/// A reaction attached to or detached from a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRecord {
    pub user: UserRef,
    pub emoji: Emoji,
    pub message: MessageRef,
}

/// Voice presence of a member at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceState {
    pub user_id: Snowflake,

    /// Connected channel, `None` when not in voice
    #[serde(default)]
    pub channel: Option<ChannelRef>,
}

/// A guild membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub user: UserRef,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
}

/// A ban record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanRecord {
    pub user: UserRef,

    /// Ban reason; the gateway usually omits it
    #[serde(default)]
    pub reason: Option<String>,
}

/// Event kinds an `EventSource` can be subscribed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    MessageUpdated,
    MessageDeleted,
    MessagesBulkDeleted,
    ReactionAdded,
    ReactionRemoved,
    /// Covers joins, leaves and moves between voice channels
    VoiceStateUpdated,
    MemberLeft,
    MemberBanned,
    MemberUnbanned,
    MemberUpdated,
}

impl EventKind {
    /// Every kind the dispatcher subscribes to
    pub const ALL: [EventKind; 10] = [
        EventKind::MessageUpdated,
        EventKind::MessageDeleted,
        EventKind::MessagesBulkDeleted,
        EventKind::ReactionAdded,
        EventKind::ReactionRemoved,
        EventKind::VoiceStateUpdated,
        EventKind::MemberLeft,
        EventKind::MemberBanned,
        EventKind::MemberUnbanned,
        EventKind::MemberUpdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageUpdated => "message-updated",
            EventKind::MessageDeleted => "message-deleted",
            EventKind::MessagesBulkDeleted => "messages-bulk-deleted",
            EventKind::ReactionAdded => "reaction-added",
            EventKind::ReactionRemoved => "reaction-removed",
            EventKind::VoiceStateUpdated => "voice-state-updated",
            EventKind::MemberLeft => "member-left",
            EventKind::MemberBanned => "member-banned",
            EventKind::MemberUnbanned => "member-unbanned",
            EventKind::MemberUpdated => "member-updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payload as delivered by the event source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RawEvent {
    MessageUpdated {
        old: MessageSnapshot,
        new: MessageSnapshot,
    },
    MessageDeleted {
        message: MessageSnapshot,
    },
    MessagesBulkDeleted {
        messages: Vec<MessageSnapshot>,
    },
    ReactionAdded {
        reaction: ReactionRecord,
    },
    ReactionRemoved {
        reaction: ReactionRecord,
    },
    VoiceStateUpdated {
        old: VoiceState,
        new: VoiceState,
    },
    MemberLeft {
        member: MemberRecord,
    },
    MemberBanned {
        ban: BanRecord,
    },
    MemberUnbanned {
        ban: BanRecord,
    },
    MemberUpdated {
        old: MemberRecord,
        new: MemberRecord,
    },
}

impl RawEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::MessageUpdated { .. } => EventKind::MessageUpdated,
            RawEvent::MessageDeleted { .. } => EventKind::MessageDeleted,
            RawEvent::MessagesBulkDeleted { .. } => EventKind::MessagesBulkDeleted,
            RawEvent::ReactionAdded { .. } => EventKind::ReactionAdded,
            RawEvent::ReactionRemoved { .. } => EventKind::ReactionRemoved,
            RawEvent::VoiceStateUpdated { .. } => EventKind::VoiceStateUpdated,
            RawEvent::MemberLeft { .. } => EventKind::MemberLeft,
            RawEvent::MemberBanned { .. } => EventKind::MemberBanned,
            RawEvent::MemberUnbanned { .. } => EventKind::MemberUnbanned,
            RawEvent::MemberUpdated { .. } => EventKind::MemberUpdated,
        }
    }
}

// ─── Normalized events ───────────────────────────────────────────

/// One message of a bulk delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessage {
    pub display_name: Option<String>,
    pub content: Option<String>,
}

/// An event reduced to the fields its notification needs
///
/// `None` fields are rendered as placeholders by the formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum NormalizedEvent {
    MessageUpdated {
        author_id: Option<Snowflake>,
        old_content: Option<String>,
        new_content: Option<String>,
    },
    MessageDeleted {
        author_id: Option<Snowflake>,
        content: Option<String>,
    },
    MessagesBulkDeleted {
        messages: Vec<DeletedMessage>,
    },
    ReactionAdded {
        user_id: Snowflake,
        emoji: Emoji,
        message: MessageRef,
    },
    ReactionRemoved {
        user_id: Snowflake,
        emoji: Emoji,
        message: MessageRef,
    },
    VoiceJoined {
        member_id: Snowflake,
        channel: ChannelRef,
    },
    VoiceLeft {
        member_id: Snowflake,
        channel: ChannelRef,
    },
    VoiceMoved {
        member_id: Snowflake,
        from: ChannelRef,
        to: ChannelRef,
    },
    MemberLeft {
        member_id: Snowflake,
        joined_at: Option<DateTime<Utc>>,
    },
    MemberBanned {
        user_id: Snowflake,
        reason: Option<String>,
    },
    MemberUnbanned {
        user_id: Snowflake,
    },
    MemberRenamed {
        member_id: Snowflake,
        old_name: Option<String>,
        new_name: Option<String>,
    },
}

impl NormalizedEvent {
    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            NormalizedEvent::MessageUpdated { .. } => "message-updated",
            NormalizedEvent::MessageDeleted { .. } => "message-deleted",
            NormalizedEvent::MessagesBulkDeleted { .. } => "messages-bulk-deleted",
            NormalizedEvent::ReactionAdded { .. } => "reaction-added",
            NormalizedEvent::ReactionRemoved { .. } => "reaction-removed",
            NormalizedEvent::VoiceJoined { .. } => "voice-joined",
            NormalizedEvent::VoiceLeft { .. } => "voice-left",
            NormalizedEvent::VoiceMoved { .. } => "voice-moved",
            NormalizedEvent::MemberLeft { .. } => "member-left",
            NormalizedEvent::MemberBanned { .. } => "member-banned",
            NormalizedEvent::MemberUnbanned { .. } => "member-unbanned",
            NormalizedEvent::MemberRenamed { .. } => "member-renamed",
        }
    }

    /// Subject and audit type to correlate, for moderation events
    pub fn audit_subject(&self) -> Option<(Snowflake, AuditEventType)> {
        match self {
            NormalizedEvent::MemberBanned { user_id, .. } => {
                Some((*user_id, AuditEventType::MemberBanAdd))
            }
            NormalizedEvent::MemberUnbanned { user_id } => {
                Some((*user_id, AuditEventType::MemberBanRemove))
            }
            _ => None,
        }
    }
}

// ─── Audit trail ─────────────────────────────────────────────────

/// Audit log action types the resolver queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuditEventType {
    MemberBanAdd,
    MemberBanRemove,
}

impl AuditEventType {
    /// Numeric action type used by the platform API
    pub fn code(&self) -> u8 {
        match self {
            AuditEventType::MemberBanAdd => 22,
            AuditEventType::MemberBanRemove => 23,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::MemberBanAdd => "member-ban-add",
            AuditEventType::MemberBanRemove => "member-ban-remove",
        }
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an audited action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum AuditExecutor {
    /// Fully resolved user
    User(UserRef),
    /// Only an id is known (user not in cache, webhook, integration)
    Unresolved { id: Snowflake },
}

/// One entry of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: AuditEventType,

    #[serde(default)]
    pub target_id: Option<Snowflake>,

    #[serde(default)]
    pub executor: Option<AuditExecutor>,

    #[serde(default)]
    pub reason: Option<String>,
}

/// Actor attributed to a moderation event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMatch {
    pub actor_id: Snowflake,
    pub actor_name: String,
}

// ─── Notifications ───────────────────────────────────────────────

/// Accent color of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorTag {
    White,
    Red,
    Green,
    Blue,
    Orange,
    Purple,
}

impl ColorTag {
    /// Hex notation (`#RRGGBB`)
    pub fn hex(&self) -> &'static str {
        match self {
            ColorTag::White => "#ECF0F1",
            ColorTag::Red => "#FF0000",
            ColorTag::Green => "#008000",
            ColorTag::Blue => "#0000FF",
            ColorTag::Orange => "#FFA500",
            ColorTag::Purple => "#5C0382",
        }
    }

    /// Packed RGB value
    pub fn rgb(&self) -> u32 {
        match self {
            ColorTag::White => 0xECF0F1,
            ColorTag::Red => 0xFF0000,
            ColorTag::Green => 0x008000,
            ColorTag::Blue => 0x0000FF,
            ColorTag::Orange => 0xFFA500,
            ColorTag::Purple => 0x5C0382,
        }
    }
}

/// Thumbnail image shown with a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ThumbnailTag {
    Bot,
    Chat,
    Microphone,
    Reaction,
    User,
    Moderation,
}

impl ThumbnailTag {
    /// Media file backing the thumbnail
    pub fn file_name(&self) -> &'static str {
        match self {
            ThumbnailTag::Bot => "bot.png",
            ThumbnailTag::Chat | ThumbnailTag::Reaction => "chat.png",
            ThumbnailTag::Microphone => "microphone.png",
            ThumbnailTag::User => "user.png",
            ThumbnailTag::Moderation => "moderation.png",
        }
    }

    /// Reference to the uploaded attachment
    pub fn attachment_url(&self) -> String {
        format!("attachment://{}", self.file_name())
    }
}

/// A label/value pair of a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub label: String,
    pub value: String,
}

/// Presentation-ready audit notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub title: String,
    pub color: ColorTag,
    pub thumbnail: ThumbnailTag,
    pub fields: Vec<NotificationField>,
}

impl NotificationRecord {
    pub fn new(title: impl Into<String>, color: ColorTag, thumbnail: ThumbnailTag) -> Self {
        Self {
            title: title.into(),
            color,
            thumbnail,
            fields: Vec::new(),
        }
    }

    /// Append a field
    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(NotificationField {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    /// Value of the first field with the given label
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}
