//! Notification delivery
//!
//! `NotificationChannel` is the outbound seam: it sends one record plus
//! its thumbnail image to the configured destination. `DeliverySink`
//! wraps a channel with the best-effort policy of the pipeline: failures
//! are logged and swallowed, never retried.

use crate::error::Result;
use crate::types::{NotificationRecord, Snowflake, ThumbnailTag};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod http;
pub mod memory;

/// Image uploaded alongside a notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Attachment name referenced by the embed (`attachment://<name>`)
    pub file_name: String,

    /// Location of the image on disk
    pub path: PathBuf,
}

impl ImageRef {
    /// Image for a thumbnail tag inside `media_dir`
    pub fn for_thumbnail(media_dir: &Path, thumbnail: ThumbnailTag) -> Self {
        let file_name = thumbnail.file_name();
        Self {
            file_name: file_name.to_string(),
            path: media_dir.join(file_name),
        }
    }
}

/// Destination for notifications
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Send a record with its thumbnail image
    async fn send(&self, record: &NotificationRecord, image: &ImageRef) -> Result<()>;

    /// Channel name (e.g., "http", "memory")
    fn name(&self) -> &str;

    /// Platform channel the notifications land in, if the backend has one
    fn destination(&self) -> Option<Snowflake> {
        None
    }
}

/// Best-effort delivery to a single channel
#[derive(Clone)]
pub struct DeliverySink {
    channel: Arc<dyn NotificationChannel>,
    media_dir: PathBuf,
}

impl DeliverySink {
    pub fn new(channel: Arc<dyn NotificationChannel>, media_dir: impl Into<PathBuf>) -> Self {
        Self {
            channel,
            media_dir: media_dir.into(),
        }
    }

    /// Image shipped with notifications using `thumbnail`
    pub fn image_for(&self, thumbnail: ThumbnailTag) -> ImageRef {
        ImageRef::for_thumbnail(&self.media_dir, thumbnail)
    }

    /// Send a record, logging any failure
    pub async fn deliver(&self, record: &NotificationRecord) {
        let image = self.image_for(record.thumbnail);

        match self.channel.send(record, &image).await {
            Ok(()) => {
                tracing::debug!(
                    channel = self.channel.name(),
                    title = %record.title,
                    "Notification delivered"
                );
            }
            Err(e) => {
                tracing::error!(
                    channel = self.channel.name(),
                    title = %record.title,
                    error = %e,
                    "Failed to deliver notification"
                );
            }
        }
    }
}
