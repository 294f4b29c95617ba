//! HTTP notification channel
//!
//! Posts each notification as a multipart message (`payload_json` plus
//! the thumbnail file) to the platform's REST API.

use super::{ImageRef, NotificationChannel};
use crate::embed;
use crate::error::{AuditLogError, Result};
use crate::types::{NotificationRecord, Snowflake};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

/// HTTP channel configuration
#[derive(Debug, Clone)]
pub struct HttpChannelConfig {
    /// REST API base URL
    pub api_base: String,

    /// Bot token sent as `Authorization: Bot <token>`
    pub token: String,

    /// Destination channel
    pub channel_id: Snowflake,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl HttpChannelConfig {
    pub fn new(token: impl Into<String>, channel_id: Snowflake) -> Self {
        Self {
            api_base: "https://discord.com/api/v10".to_string(),
            token: token.into(),
            channel_id,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Notification channel backed by the REST API
pub struct HttpChannel {
    client: reqwest::Client,
    config: HttpChannelConfig,
}

impl HttpChannel {
    pub fn new(config: HttpChannelConfig) -> Result<Self> {
        if config.token.is_empty() {
            return Err(AuditLogError::Config("bot token must be set".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Endpoint receiving new messages for the destination channel
    pub fn messages_url(&self) -> String {
        format!(
            "{}/channels/{}/messages",
            self.config.api_base.trim_end_matches('/'),
            self.config.channel_id
        )
    }
}

#[async_trait]
impl NotificationChannel for HttpChannel {
    async fn send(&self, record: &NotificationRecord, image: &ImageRef) -> Result<()> {
        let payload = serde_json::to_string(&embed::message_payload(record, image))?;
        let bytes = tokio::fs::read(&image.path).await?;

        let file = Part::bytes(bytes)
            .file_name(image.file_name.clone())
            .mime_str("image/png")?;
        let form = Form::new()
            .text("payload_json", payload)
            .part("files[0]", file);

        let response = self
            .client
            .post(self.messages_url())
            .header(AUTHORIZATION, format!("Bot {}", self.config.token))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuditLogError::Delivery {
                channel_id: self.config.channel_id,
                reason: format!("{}: {}", status, body),
            });
        }

        tracing::debug!(
            channel_id = self.config.channel_id,
            status = %status,
            "Message posted"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }

    fn destination(&self) -> Option<Snowflake> {
        Some(self.config.channel_id)
    }
}
