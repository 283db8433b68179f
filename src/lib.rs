//! Group Setup Server Library
//!
//! Case onboarding workflow engine for insurance group setup. This library
//! exposes the engine, its collaborators and the wiring used by the binary.

pub mod app;
pub mod case;
pub mod config;
pub mod events;
pub mod payload;
pub mod workflow;

// Re-export commonly used types for convenience
pub use app::{load_catalog, App};
pub use events::{DomainEvent, EventHandler, EventKind, EventPublisher};
pub use payload::{PayloadAssembler, ServicingPayload};
pub use workflow::{WorkflowError, WorkflowManager, WorkflowResult};
