use thiserror::Error;

use super::models::{StepStatus, WorkflowStatus};

/// Errors returned by workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("No workflow found for case {0}")]
    InstanceNotFound(String),

    #[error("Step {0} not found")]
    StepNotFound(String),

    #[error("No active workflow definition found for {0}")]
    DefinitionNotFound(String),

    #[error("Workflow already exists for case {0}")]
    AlreadyExists(String),

    #[error("Workflow is completed and locked")]
    Locked,

    #[error("Step {0} has been signed and can no longer be modified")]
    SignedStepLocked(String),

    #[error("Step {step_id} is {status} and cannot be {action}")]
    InvalidStepState {
        step_id: String,
        status: StepStatus,
        action: &'static str,
    },

    #[error("Invalid workflow state: expected one of {expected}, got {actual}")]
    InvalidState {
        expected: String,
        actual: WorkflowStatus,
    },

    #[error("Required steps not completed: {}", .0.join(", "))]
    IncompleteSteps(Vec<String>),

    #[error("No remaining steps require the employer")]
    NoEmployerStep,

    #[error("No employer contact found for case {0}")]
    NoEmployerContact(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Broad classes of workflow errors, for callers that map them to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    Validation,
    Internal,
}

impl ErrorKind {
    /// HTTP-class status code an outer layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyExists | ErrorKind::Validation => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::CaseNotFound(_)
            | WorkflowError::InstanceNotFound(_)
            | WorkflowError::StepNotFound(_)
            | WorkflowError::DefinitionNotFound(_)
            | WorkflowError::NoEmployerStep
            | WorkflowError::NoEmployerContact(_) => ErrorKind::NotFound,
            WorkflowError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            WorkflowError::Locked
            | WorkflowError::SignedStepLocked(_)
            | WorkflowError::InvalidStepState { .. }
            | WorkflowError::InvalidState { .. }
            | WorkflowError::IncompleteSteps(_) => ErrorKind::Validation,
            WorkflowError::Store(_) => ErrorKind::Internal,
        }
    }
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_steps_message_lists_every_step() {
        let err = WorkflowError::IncompleteSteps(vec!["a".to_string(), "c".to_string()]);
        assert_eq!(err.to_string(), "Required steps not completed: a, c");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn kinds_map_to_status_codes() {
        assert_eq!(
            WorkflowError::StepNotFound("x".to_string()).kind().status_code(),
            404
        );
        assert_eq!(
            WorkflowError::AlreadyExists("c".to_string()).kind().status_code(),
            400
        );
        assert_eq!(WorkflowError::Locked.kind().status_code(), 400);
        assert_eq!(
            WorkflowError::Store(anyhow::anyhow!("boom")).kind().status_code(),
            500
        );
    }
}
