//! Handoff notifications.
//!
//! The engine never sends anything itself. A handoff request emits an event,
//! and [`HandoffNotificationHandler`] turns that event into a notice for the
//! configured [`NotificationDispatcher`].

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

use super::models::{DomainEvent, WorkflowEvent};
use super::publisher::EventHandler;

/// "Your input is needed" message sent to an employer contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffNotice {
    pub to_email: String,
    pub to_name: String,
    pub case_name: String,
    pub next_step_name: String,
    pub broker_name: String,
}

impl HandoffNotice {
    pub fn subject(&self) -> String {
        format!("Action required: {} group setup", self.case_name)
    }

    pub fn body(&self) -> String {
        format!(
            "Hello {},\n\n{} has prepared the group setup for {} and needs you to \
             continue with the \"{}\" step.\n",
            self.to_name, self.broker_name, self.case_name, self.next_step_name
        )
    }
}

/// Delivery backend for handoff notices.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_handoff_notice(&self, notice: &HandoffNotice) -> Result<()>;
}

/// Dispatcher that only logs notices and keeps them for inspection.
#[derive(Default)]
pub struct ConsoleDispatcher {
    sent: Mutex<Vec<HandoffNotice>>,
}

impl ConsoleDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notices sent so far.
    pub fn sent(&self) -> Vec<HandoffNotice> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationDispatcher for ConsoleDispatcher {
    async fn send_handoff_notice(&self, notice: &HandoffNotice) -> Result<()> {
        info!(
            "Handoff notice to {} <{}>: {}\n{}",
            notice.to_name,
            notice.to_email,
            notice.subject(),
            notice.body()
        );
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Console dispatcher lock poisoned"))?
            .push(notice.clone());
        Ok(())
    }
}

/// Sends a handoff notice for every handoff request.
pub struct HandoffNotificationHandler {
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl HandoffNotificationHandler {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl EventHandler for HandoffNotificationHandler {
    fn name(&self) -> &str {
        "handoff_notification"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<()> {
        let WorkflowEvent::HandoffRequested {
            employer_email,
            employer_name,
            case_name,
            next_step_name,
            broker_name,
            ..
        } = &event.event
        else {
            debug!(
                "Ignoring {} in handoff notification handler",
                event.kind().as_str()
            );
            return Ok(());
        };

        let notice = HandoffNotice {
            to_email: employer_email.clone(),
            to_name: employer_name.clone(),
            case_name: case_name.clone(),
            next_step_name: next_step_name.clone(),
            broker_name: broker_name.clone(),
        };
        self.dispatcher.send_handoff_notice(&notice).await
    }
}
