//! Readiness gate
//!
//! Waits for the event source's latency signal to turn non-negative,
//! then announces the (re)start with a single notification.

use crate::config::AuditLogConfig;
use crate::error::{AuditLogError, Result};
use crate::format::format_startup;
use crate::sink::DeliverySink;
use crate::source::EventSource;
use std::sync::Arc;
use std::time::Duration;

/// Polls the source until it is ready, then sends the startup notification
pub struct ReadinessGate {
    source: Arc<dyn EventSource>,
    sink: DeliverySink,
    poll_interval: Duration,
    timeout: Option<Duration>,
}

impl ReadinessGate {
    pub fn new(source: Arc<dyn EventSource>, sink: DeliverySink, config: &AuditLogConfig) -> Self {
        Self::with_timing(
            source,
            sink,
            config.ready_poll_interval(),
            config.ready_timeout(),
        )
    }

    pub fn with_timing(
        source: Arc<dyn EventSource>,
        sink: DeliverySink,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            source,
            sink,
            poll_interval,
            timeout,
        }
    }

    /// Wait until the source reports a non-negative latency
    ///
    /// The signal is sampled once per poll interval, the first sample
    /// after one full interval. Returns the latency that ended the wait.
    pub async fn await_ready(&self) -> Result<i64> {
        let poll = async {
            loop {
                tokio::time::sleep(self.poll_interval).await;
                let latency = self.source.latency();
                if latency >= 0 {
                    return latency;
                }
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, poll).await.map_err(|_| {
                AuditLogError::Timeout(format!(
                    "event source '{}' not ready after {:?}",
                    self.source.name(),
                    limit
                ))
            }),
            None => Ok(poll.await),
        }
    }

    /// Await readiness and send the startup notification
    ///
    /// Never fails: errors are logged.
    pub async fn run(&self) {
        let latency = match self.await_ready().await {
            Ok(latency) => latency,
            Err(e) => {
                tracing::error!(error = %e, "Event source never became ready");
                return;
            }
        };

        let bot = self.source.current_user();
        if bot.is_none() {
            tracing::warn!("Source ready without a known bot identity");
        }

        tracing::info!(latency_ms = latency, "Sending startup notification");
        let record = format_startup(bot.as_ref(), latency);
        self.sink.deliver(&record).await;
    }
}
