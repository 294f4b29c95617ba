//! Audit logger — wires the pipeline together
//!
//! `AuditLogger::start` registers the dispatcher and launches the
//! readiness gate concurrently. Registration does not wait for the source
//! to become ready.

use crate::config::AuditLogConfig;
use crate::dispatch::Dispatcher;
use crate::error::{AuditLogError, Result};
use crate::ready::ReadinessGate;
use crate::resolver::AuditResolver;
use crate::sink::{DeliverySink, NotificationChannel};
use crate::source::{AuditTrail, EventSource};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Running audit logger
///
/// Dropping it leaves the background tasks running; call `shutdown`
/// to stop them.
pub struct AuditLogger {
    dispatcher: Arc<Dispatcher>,
    readiness: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
}

impl AuditLogger {
    /// Validate `config` and start listening
    ///
    /// Fails if `channel` posts to a different channel than
    /// `config.log_channel_id`. Must be called from within a tokio runtime.
    pub fn start(
        source: Arc<dyn EventSource>,
        trail: Arc<dyn AuditTrail>,
        channel: Arc<dyn NotificationChannel>,
        config: AuditLogConfig,
    ) -> Result<Self> {
        config.validate()?;
        if let Some(destination) = channel.destination() {
            if destination != config.log_channel_id {
                return Err(AuditLogError::Config(format!(
                    "{} channel posts to {} but logChannelId is {}",
                    channel.name(),
                    destination,
                    config.log_channel_id
                )));
            }
        }

        let sink = DeliverySink::new(channel, config.media_dir.clone());
        let resolver = AuditResolver::with_limit(trail, config.audit_query_limit);

        let gate = ReadinessGate::new(source.clone(), sink.clone(), &config);
        let readiness = tokio::spawn(async move { gate.run().await });

        let dispatcher = Arc::new(Dispatcher::new(source.clone(), resolver, sink));
        let listeners = dispatcher.register();

        tracing::info!(
            source = source.name(),
            log_channel_id = config.log_channel_id,
            kinds = listeners.len(),
            "Audit logger started"
        );

        Ok(Self {
            dispatcher,
            readiness,
            listeners,
        })
    }

    /// Dispatcher driving the listeners
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Whether the startup notification task has finished
    pub fn startup_finished(&self) -> bool {
        self.readiness.is_finished()
    }

    /// Stop all listeners and the readiness gate
    pub async fn shutdown(self) {
        self.readiness.abort();
        for listener in &self.listeners {
            listener.abort();
        }

        let mut handles = self.listeners;
        handles.push(self.readiness);
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                if e.is_panic() {
                    tracing::error!(error = %e, "Audit logger task panicked");
                }
            }
        }

        tracing::info!("Audit logger stopped");
    }
}
