//! In-process fan-out of domain events to subscribed handlers.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use tracing::{debug, error};

use super::models::{DomainEvent, EventKind};

/// Something that reacts to domain events (audit trail, notifications...).
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn handle(&self, event: &DomainEvent) -> Result<()>;
}

/// Topic-based event publisher.
///
/// Handlers are registered once at startup, before the publisher is shared.
/// Publishing runs every handler for the event's kind in subscription order and
/// never fails: errors and panics in a handler are logged and the remaining
/// handlers still run.
#[derive(Default)]
pub struct EventPublisher {
    handlers: HashMap<EventKind, Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        debug!("Subscribing {} to {}", handler.name(), kind.as_str());
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Subscribe a handler to every event kind.
    pub fn subscribe_all(&mut self, handler: Arc<dyn EventHandler>) {
        for kind in EventKind::ALL {
            self.subscribe(kind, handler.clone());
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    pub async fn publish(&self, event: DomainEvent) {
        let kind = event.kind();
        let Some(handlers) = self.handlers.get(&kind) else {
            debug!("No handlers for {} ({})", kind.as_str(), event.event_id);
            return;
        };

        for handler in handlers {
            match AssertUnwindSafe(handler.handle(&event)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(
                    "Error handling event {} ({}) in {}: {:#}",
                    kind.as_str(),
                    event.event_id,
                    handler.name(),
                    e
                ),
                Err(_) => error!(
                    "Handler {} panicked on event {} ({})",
                    handler.name(),
                    kind.as_str(),
                    event.event_id
                ),
            }
        }
    }
}
