//! Domain events and their subscribers.

mod audit;
mod models;
mod notification;
mod publisher;

pub use audit::{AuditHandler, AuditLogEntry, AuditLogStore, InMemoryAuditLog};
pub use models::{DomainEvent, EventKind, WorkflowEvent};
pub use notification::{
    ConsoleDispatcher, HandoffNotice, HandoffNotificationHandler, NotificationDispatcher,
};
pub use publisher::{EventHandler, EventPublisher};
