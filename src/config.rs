//! Audit logger configuration

use crate::error::{AuditLogError, Result};
use crate::types::Snowflake;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the audit logger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogConfig {
    /// Channel receiving every notification
    pub log_channel_id: Snowflake,

    /// Interval between readiness samples (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub ready_poll_interval_ms: u64,

    /// Give up waiting for readiness after this many seconds
    ///
    /// `None` polls until the source becomes ready.
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: Option<u64>,

    /// Number of audit entries fetched per correlation
    #[serde(default = "default_audit_query_limit")]
    pub audit_query_limit: u8,

    /// Directory holding the thumbnail images
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_ready_timeout_secs() -> Option<u64> {
    Some(300)
}

fn default_audit_query_limit() -> u8 {
    1
}

fn default_media_dir() -> PathBuf {
    PathBuf::from("media/discordLog")
}

impl Default for AuditLogConfig {
    fn default() -> Self {
        Self {
            log_channel_id: 0,
            ready_poll_interval_ms: default_poll_interval_ms(),
            ready_timeout_secs: default_ready_timeout_secs(),
            audit_query_limit: default_audit_query_limit(),
            media_dir: default_media_dir(),
        }
    }
}

impl AuditLogConfig {
    /// Config for the given destination channel, defaults elsewhere
    pub fn for_channel(log_channel_id: Snowflake) -> Self {
        Self {
            log_channel_id,
            ..Default::default()
        }
    }

    /// Parse and validate a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.log_channel_id == 0 {
            return Err(AuditLogError::Config(
                "logChannelId must be set".to_string(),
            ));
        }
        if self.ready_poll_interval_ms == 0 {
            return Err(AuditLogError::Config(
                "readyPollIntervalMs must be greater than zero".to_string(),
            ));
        }
        if self.audit_query_limit == 0 || self.audit_query_limit > 100 {
            return Err(AuditLogError::Config(format!(
                "auditQueryLimit must be between 1 and 100, got {}",
                self.audit_query_limit
            )));
        }
        Ok(())
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Option<Duration> {
        self.ready_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuditLogConfig::for_channel(123);
        assert_eq!(config.log_channel_id, 123);
        assert_eq!(config.ready_poll_interval(), Duration::from_millis(500));
        assert_eq!(config.ready_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.audit_query_limit, 1);
        assert_eq!(config.media_dir, PathBuf::from("media/discordLog"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_minimal() {
        let config = AuditLogConfig::from_json(r#"{"logChannelId": 987}"#).unwrap();
        assert_eq!(config.log_channel_id, 987);
        assert_eq!(config.ready_poll_interval_ms, 500);
    }

    #[test]
    fn test_from_json_poll_forever() {
        let config = AuditLogConfig::from_json(
            r#"{"logChannelId": 1, "readyTimeoutSecs": null, "readyPollIntervalMs": 250}"#,
        )
        .unwrap();
        assert_eq!(config.ready_timeout(), None);
        assert_eq!(config.ready_poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_channel_rejected() {
        let err = AuditLogConfig::default().validate().unwrap_err();
        assert!(matches!(err, AuditLogError::Config(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AuditLogConfig {
            ready_poll_interval_ms: 0,
            ..AuditLogConfig::for_channel(1)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_audit_limit_bounds() {
        let config = AuditLogConfig {
            audit_query_limit: 101,
            ..AuditLogConfig::for_channel(1)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = AuditLogConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, AuditLogError::Serialization(_)));
    }
}
