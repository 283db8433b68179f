//! Workflow and step instance models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::case::Role;

/// Free-form data captured for a step. Its schema is specific to each step and
/// only the payload assembler looks inside it.
pub type StepData = serde_json::Map<String, serde_json::Value>;

/// Overall status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    NotStarted,
    InProgress,
    Offline,
    PendingEmployer,
    OfflineSubmitted,
    OfflineInReview,
    Completed, // terminal
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::NotStarted => "NOT_STARTED",
            WorkflowStatus::InProgress => "IN_PROGRESS",
            WorkflowStatus::Offline => "OFFLINE",
            WorkflowStatus::PendingEmployer => "PENDING_EMPLOYER",
            WorkflowStatus::OfflineSubmitted => "OFFLINE_SUBMITTED",
            WorkflowStatus::OfflineInReview => "OFFLINE_IN_REVIEW",
            WorkflowStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NOT_STARTED" => Some(WorkflowStatus::NotStarted),
            "IN_PROGRESS" => Some(WorkflowStatus::InProgress),
            "OFFLINE" => Some(WorkflowStatus::Offline),
            "PENDING_EMPLOYER" => Some(WorkflowStatus::PendingEmployer),
            "OFFLINE_SUBMITTED" => Some(WorkflowStatus::OfflineSubmitted),
            "OFFLINE_IN_REVIEW" => Some(WorkflowStatus::OfflineInReview),
            "COMPLETED" => Some(WorkflowStatus::Completed),
            _ => None,
        }
    }

    /// Whether the employer may be asked to take over from this status.
    pub fn accepts_handoff(&self) -> bool {
        matches!(
            self,
            WorkflowStatus::InProgress | WorkflowStatus::PendingEmployer
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single step instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,     // terminal
    Skipped,       // terminal
    NotApplicable, // terminal, only set by external seeding
}

impl StepStatus {
    /// Returns true if no further transition is allowed from this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Skipped | StepStatus::NotApplicable
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "PENDING",
            StepStatus::InProgress => "IN_PROGRESS",
            StepStatus::Completed => "COMPLETED",
            StepStatus::Skipped => "SKIPPED",
            StepStatus::NotApplicable => "NOT_APPLICABLE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(StepStatus::Pending),
            "IN_PROGRESS" => Some(StepStatus::InProgress),
            "COMPLETED" => Some(StepStatus::Completed),
            "SKIPPED" => Some(StepStatus::Skipped),
            "NOT_APPLICABLE" => Some(StepStatus::NotApplicable),
            _ => None,
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a running workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepInstance {
    /// Unique identifier (UUID)
    pub id: String,
    /// Owning workflow instance
    pub workflow_instance_id: String,
    pub step_id: String,
    /// Copied from the definition at creation, never changes afterwards
    pub step_order: i32,
    pub status: StepStatus,
    /// First role the definition authorizes for this step
    pub assigned_role: Option<Role>,
    pub data: Option<StepData>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl StepInstance {
    pub fn new(
        workflow_instance_id: &str,
        step_id: &str,
        step_order: i32,
        assigned_role: Option<Role>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            workflow_instance_id: workflow_instance_id.to_string(),
            step_id: step_id.to_string(),
            step_order,
            status: StepStatus::Pending,
            assigned_role,
            data: None,
            started_at: None,
            completed_at: None,
            last_saved_at: None,
        }
    }

    /// True when the step carries at least one data field.
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }
}

/// A workflow run for one case, with all of its steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Unique identifier (UUID)
    pub id: String,
    pub case_id: String,
    /// Name of the definition this instance is bound to
    pub definition_name: String,
    /// Version of the definition this instance is bound to
    pub definition_version: u32,
    pub status: WorkflowStatus,
    /// Step the case is currently on, None once every step is terminal
    pub current_step_id: Option<String>,
    pub is_offline: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepInstance>,
}

impl WorkflowInstance {
    pub fn new(case_id: &str, definition_name: &str, definition_version: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            case_id: case_id.to_string(),
            definition_name: definition_name.to_string(),
            definition_version,
            status: WorkflowStatus::NotStarted,
            current_step_id: None,
            is_offline: false,
            started_at: None,
            completed_at: None,
            steps: Vec::new(),
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepInstance> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &str) -> Option<&mut StepInstance> {
        self.steps.iter_mut().find(|s| s.step_id == step_id)
    }

    /// Steps sorted by their fixed order.
    pub fn ordered_steps(&self) -> Vec<&StepInstance> {
        let mut steps: Vec<&StepInstance> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.step_order);
        steps
    }

    pub fn is_locked(&self) -> bool {
        self.status == WorkflowStatus::Completed
    }
}

/// Step instance enriched with the roles its definition authorizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    #[serde(flatten)]
    pub step: StepInstance,
    pub name: Option<String>,
    pub allowed_roles: Vec<Role>,
}

/// Workflow instance as presented to callers that render the step list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowView {
    pub id: String,
    pub case_id: String,
    pub status: WorkflowStatus,
    pub current_step_id: Option<String>,
    pub is_offline: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub steps: Vec<StepView>,
}

/// Snapshot of a single step's data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepDataView {
    pub step_id: String,
    pub status: StepStatus,
    pub data: StepData,
}

/// Result of a step completion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepCompletion {
    pub step_id: String,
    pub status: StepStatus,
    /// Where the cursor moved to, None at the end of the workflow
    pub next_step_id: Option<String>,
    /// True when this completion finished the whole workflow
    pub workflow_completed: bool,
}

/// Request-level facts captured by the server when a step is completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn new(ip: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            ip: Some(ip.into()),
            user_agent: Some(user_agent.into()),
        }
    }
}

/// Outcome of an employer handoff request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandoffResult {
    pub status: WorkflowStatus,
    pub employer_email: String,
    pub employer_name: String,
    pub next_step_id: String,
    pub next_step_name: String,
}
