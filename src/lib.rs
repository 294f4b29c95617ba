//! # a3s-auditlog
//!
//! Audit notifications for guild events: message edits and deletions,
//! reactions, voice presence, membership changes, and moderation actions.
//!
//! ## Overview
//!
//! `a3s-auditlog` listens to a live event source, normalizes every event
//! into a small tagged union, attributes bans and unbans to the moderator
//! found in the audit trail, and delivers one notification per event to a
//! single output channel. Delivery is best-effort: failures are logged,
//! never retried, and never affect other events.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use a3s_auditlog::{AuditLogConfig, AuditLogger, MemoryAuditTrail, MemoryChannel, MemorySource};
//!
//! # async fn example() -> a3s_auditlog::Result<()> {
//! let source = Arc::new(MemorySource::default());
//! let logger = AuditLogger::start(
//!     source.clone(),
//!     Arc::new(MemoryAuditTrail::new()),
//!     Arc::new(MemoryChannel::new()),
//!     AuditLogConfig::for_channel(123456789),
//! )?;
//!
//! // Events emitted by the source are now turned into notifications.
//! logger.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **EventSource** / **AuditTrail** traits — the seam to the platform connection
//! - **ReadinessGate** — waits for the source, then announces the start
//! - **Dispatcher** — one listener per event kind, one supervised task per event
//! - **AuditResolver** — attributes moderation events via the audit trail
//! - **format** — pure event → `NotificationRecord` mapping
//! - **DeliverySink** / **NotificationChannel** — best-effort delivery

pub mod config;
pub mod dispatch;
pub mod embed;
pub mod error;
pub mod format;
pub mod logger;
pub mod normalize;
pub mod ready;
pub mod resolver;
pub mod sink;
pub mod source;
pub mod types;

// Re-export core types
pub use config::AuditLogConfig;
pub use dispatch::{supervise, Dispatcher, Outcome};
pub use error::{AuditLogError, Result};
pub use format::{format_event, format_startup};
pub use logger::AuditLogger;
pub use normalize::normalize;
pub use ready::ReadinessGate;
pub use resolver::AuditResolver;
pub use sink::{DeliverySink, ImageRef, NotificationChannel};
pub use source::{AuditTrail, EventSource, Subscription};
pub use types::{
    AuditEntry, AuditEventType, AuditExecutor, AuditMatch, BanRecord, ChannelRef, ColorTag,
    DeletedMessage, Emoji, EventKind, MemberRecord, MessageRef, MessageSnapshot, NormalizedEvent,
    NotificationField, NotificationRecord, RawEvent, ReactionRecord, Snowflake, ThumbnailTag,
    UserRef, VoiceState,
};

// Re-export backends for convenience
pub use sink::http::{HttpChannel, HttpChannelConfig};
pub use sink::memory::MemoryChannel;
pub use source::memory::{MemoryAuditTrail, MemorySource, MemorySourceConfig};
