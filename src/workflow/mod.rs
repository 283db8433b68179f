//! Workflow definitions, instances and the engine driving them.

mod definition;
mod error;
mod locks;
mod manager;
mod models;
mod progress;
mod step_ops;
mod store;

pub use definition::{
    DefinitionCatalog, StepDefinition, WorkflowDefinition, GROUP_SETUP_WORKFLOW,
};
pub use error::{ErrorKind, WorkflowError, WorkflowResult};
pub use manager::{WorkflowManager, WorkflowSettings};
pub use models::{
    HandoffResult, RequestContext, StepCompletion, StepData, StepDataView, StepInstance,
    StepStatus, StepView, WorkflowInstance, WorkflowStatus, WorkflowView,
};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
