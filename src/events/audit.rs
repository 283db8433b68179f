//! Audit trail of workflow events.
//!
//! The [`AuditHandler`] subscribes to every event kind and appends one
//! [`AuditLogEntry`] per event to an [`AuditLogStore`].

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use super::models::DomainEvent;
use super::publisher::EventHandler;

/// A persisted audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditLogEntry {
    pub event_id: String,
    pub event_type: &'static str,
    pub timestamp: DateTime<Utc>,
    pub case_id: String,
    pub user_id: Option<String>,
    /// Full serialized event
    pub details: serde_json::Value,
}

/// Trait for audit log storage.
pub trait AuditLogStore: Send + Sync {
    /// Append an audit entry.
    fn append(&self, entry: AuditLogEntry) -> Result<()>;

    /// All entries for a case, oldest first.
    fn entries_for_case(&self, case_id: &str) -> Result<Vec<AuditLogEntry>>;
}

/// In-memory audit log.
#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AuditLogEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditLogStore for InMemoryAuditLog {
    fn append(&self, entry: AuditLogEntry) -> Result<()> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Audit log lock poisoned"))?
            .push(entry);
        Ok(())
    }

    fn entries_for_case(&self, case_id: &str) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("Audit log lock poisoned"))?
            .iter()
            .filter(|e| e.case_id == case_id)
            .cloned()
            .collect())
    }
}

/// Persists every published event to the audit log.
pub struct AuditHandler {
    store: Arc<dyn AuditLogStore>,
}

impl AuditHandler {
    pub fn new(store: Arc<dyn AuditLogStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EventHandler for AuditHandler {
    fn name(&self) -> &str {
        "audit"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let details = serde_json::to_value(event).context("Failed to serialize event")?;
        let entry = AuditLogEntry {
            event_id: event.event_id.clone(),
            event_type: event.kind().as_str(),
            timestamp: event.timestamp,
            case_id: event.case_id.clone(),
            user_id: event.user_id.clone(),
            details,
        };
        self.store.append(entry)?;
        info!(
            "Audit log persisted for event {} (event_id={})",
            event.kind().as_str(),
            event.event_id
        );
        Ok(())
    }
}
