//! In-memory notification channel for development and testing
//!
//! Records every successful delivery and can be told to fail a number of
//! upcoming sends.

use super::{ImageRef, NotificationChannel};
use crate::error::{AuditLogError, Result};
use crate::types::NotificationRecord;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock};

/// In-memory notification channel
#[derive(Default)]
pub struct MemoryChannel {
    delivered: Arc<RwLock<Vec<(NotificationRecord, ImageRef)>>>,
    attempts: AtomicUsize,
    failures: AtomicUsize,
    notify: Notify,
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` sends fail
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Number of sends attempted, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Successfully delivered records, oldest first
    pub async fn deliveries(&self) -> Vec<(NotificationRecord, ImageRef)> {
        self.delivered.read().await.clone()
    }

    /// Successfully delivered records without their images
    pub async fn records(&self) -> Vec<NotificationRecord> {
        self.delivered
            .read()
            .await
            .iter()
            .map(|(record, _)| record.clone())
            .collect()
    }

    /// Wait until at least `count` sends were attempted
    ///
    /// Returns `AuditLogError::Timeout` if that does not happen in time.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> Result<()> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.attempts() >= count {
                    return;
                }
                notified.await;
            }
        };

        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            AuditLogError::Timeout(format!(
                "expected {} delivery attempts, saw {}",
                count,
                self.attempts()
            ))
        })
    }
}

#[async_trait]
impl NotificationChannel for MemoryChannel {
    async fn send(&self, record: &NotificationRecord, image: &ImageRef) -> Result<()> {
        let result = if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            Err(AuditLogError::Delivery {
                channel_id: 0,
                reason: "injected failure".to_string(),
            })
        } else {
            self.delivered
                .write()
                .await
                .push((record.clone(), image.clone()));
            Ok(())
        };

        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();
        result
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColorTag, ThumbnailTag};
    use std::path::PathBuf;

    fn image() -> ImageRef {
        ImageRef {
            file_name: "chat.png".to_string(),
            path: PathBuf::from("media/chat.png"),
        }
    }

    fn record(title: &str) -> NotificationRecord {
        NotificationRecord::new(title, ColorTag::Orange, ThumbnailTag::Chat)
    }

    #[tokio::test]
    async fn test_records_deliveries_in_order() {
        let channel = MemoryChannel::new();
        channel.send(&record("a"), &image()).await.unwrap();
        channel.send(&record("b"), &image()).await.unwrap();

        let titles: Vec<String> = channel
            .records()
            .await
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert_eq!(channel.attempts(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let channel = MemoryChannel::new();
        channel.fail_next(1);

        let err = channel.send(&record("a"), &image()).await.unwrap_err();
        assert!(matches!(err, AuditLogError::Delivery { .. }));
        assert!(channel.send(&record("b"), &image()).await.is_ok());
        assert_eq!(channel.records().await.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_attempts() {
        let channel = Arc::new(MemoryChannel::new());

        let sender = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = sender.send(&record("late"), &image()).await;
        });

        channel
            .wait_for_attempts(1, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(channel.attempts(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_attempts_times_out() {
        let channel = MemoryChannel::new();
        let result = channel
            .wait_for_attempts(1, Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(AuditLogError::Timeout(_))));
    }
}
