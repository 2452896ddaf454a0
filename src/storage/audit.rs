// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for certificate and key operations.
//!
//! Issuance and single-resource reads write their events through an
//! [`AuditSink`] before the operation returns. Listing reads hand their
//! events to an [`AuditDispatcher`]; the [`AuditWorker`] writes them in the
//! background under its own cancellation token. Failures in the background
//! path are logged and otherwise lost: callers never observe them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::StoreResult;

/// What was done to the audited resource.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditActivity {
    Create,
    Read,
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub activity: AuditActivity,
    /// User who triggered the event.
    pub user_id: String,
    /// Resource name, e.g. `certificate:{id}:body`.
    pub resource: String,
    pub success: bool,
    pub error: Option<String>,
}

impl AuditEvent {
    pub fn new(activity: AuditActivity, user_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            activity,
            user_id: user_id.into(),
            resource: resource.into(),
            success: true,
            error: None,
        }
    }

    pub fn create(user_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(AuditActivity::Create, user_id, resource)
    }

    pub fn read(user_id: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(AuditActivity::Read, user_id, resource)
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

pub fn certificate_resource(certificate_id: &str) -> String {
    format!("certificate:{certificate_id}")
}

pub fn certificate_body_resource(certificate_id: &str) -> String {
    format!("certificate:{certificate_id}:body")
}

pub fn key_pair_resource(key_pair_id: &str) -> String {
    format!("key-pair:{key_pair_id}")
}

pub fn private_key_resource(key_pair_id: &str) -> String {
    format!("key-pair:{key_pair_id}:private-key")
}

/// Synchronous destination for audit events.
pub trait AuditSink: Send + Sync {
    fn log(&self, event: &AuditEvent) -> StoreResult<()>;
}

// =============================================================================
// Background dispatch
// =============================================================================

/// Fire-and-forget handle for audit events that must not delay a response.
#[derive(Clone)]
pub struct AuditDispatcher {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl AuditDispatcher {
    /// Create a dispatcher and the worker that drains it into `sink`.
    pub fn channel(sink: Arc<dyn AuditSink>) -> (AuditDispatcher, AuditWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AuditDispatcher { tx }, AuditWorker { rx, sink })
    }

    /// Queue events for background writing. Never blocks and never fails.
    pub fn dispatch(&self, events: Vec<AuditEvent>) {
        for event in events {
            if let Err(e) = self.tx.send(event) {
                warn!(
                    resource = %e.0.resource,
                    "Audit worker is gone, dropping audit event"
                );
            }
        }
    }
}

/// Background task writing dispatched audit events.
pub struct AuditWorker {
    rx: mpsc::UnboundedReceiver<AuditEvent>,
    sink: Arc<dyn AuditSink>,
}

impl AuditWorker {
    /// Run until the cancellation token is triggered or every dispatcher is
    /// dropped. Events already queued at cancellation are still written.
    ///
    /// ```rust,ignore
    /// tokio::spawn(worker.run(shutdown.clone()));
    /// ```
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Audit worker starting");

        loop {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(event) => self.write(event).await,
                    None => {
                        info!("Audit channel closed, audit worker stopping");
                        return;
                    }
                },
                _ = shutdown.cancelled() => {
                    self.drain().await;
                    info!("Audit worker shutting down");
                    return;
                }
            }
        }
    }

    async fn drain(&mut self) {
        self.rx.close();
        while let Some(event) = self.rx.recv().await {
            self.write(event).await;
        }
    }

    async fn write(&self, event: AuditEvent) {
        let sink = Arc::clone(&self.sink);
        let resource = event.resource.clone();

        match tokio::task::spawn_blocking(move || sink.log(&event)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(resource = %resource, error = %e, "Failed to write audit event"),
            Err(e) => warn!(resource = %resource, error = %e, "Audit write task failed"),
        }
    }
}
