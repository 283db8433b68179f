//! Domain events emitted by the workflow engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payload::ServicingPayload;

/// Kinds of events handlers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    GroupSetupStarted,
    OfflineSetupChosen,
    WorkflowStepSaved,
    WorkflowStepCompleted,
    WorkflowStepSkipped,
    WorkflowHandoffRequested,
    WorkflowSubmitted,
}

impl EventKind {
    pub const ALL: [EventKind; 7] = [
        EventKind::GroupSetupStarted,
        EventKind::OfflineSetupChosen,
        EventKind::WorkflowStepSaved,
        EventKind::WorkflowStepCompleted,
        EventKind::WorkflowStepSkipped,
        EventKind::WorkflowHandoffRequested,
        EventKind::WorkflowSubmitted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::GroupSetupStarted => "group_setup_started",
            EventKind::OfflineSetupChosen => "offline_setup_chosen",
            EventKind::WorkflowStepSaved => "workflow_step_saved",
            EventKind::WorkflowStepCompleted => "workflow_step_completed",
            EventKind::WorkflowStepSkipped => "workflow_step_skipped",
            EventKind::WorkflowHandoffRequested => "workflow_handoff_requested",
            EventKind::WorkflowSubmitted => "workflow_submitted",
        }
    }
}

/// Event-specific fields.
///
/// Serialized adjacently tagged: `{"type": "event_name", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkflowEvent {
    #[serde(rename = "group_setup_started")]
    GroupSetupStarted,

    #[serde(rename = "offline_setup_chosen")]
    OfflineSetupChosen,

    #[serde(rename = "workflow_step_saved")]
    StepSaved { step_id: String },

    #[serde(rename = "workflow_step_completed")]
    StepCompleted { step_id: String },

    #[serde(rename = "workflow_step_skipped")]
    StepSkipped { step_id: String },

    #[serde(rename = "workflow_handoff_requested")]
    HandoffRequested {
        employer_email: String,
        employer_name: String,
        case_name: String,
        next_step_id: String,
        next_step_name: String,
        broker_name: String,
    },

    #[serde(rename = "workflow_submitted")]
    Submitted { payload: Box<ServicingPayload> },
}

impl WorkflowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkflowEvent::GroupSetupStarted => EventKind::GroupSetupStarted,
            WorkflowEvent::OfflineSetupChosen => EventKind::OfflineSetupChosen,
            WorkflowEvent::StepSaved { .. } => EventKind::WorkflowStepSaved,
            WorkflowEvent::StepCompleted { .. } => EventKind::WorkflowStepCompleted,
            WorkflowEvent::StepSkipped { .. } => EventKind::WorkflowStepSkipped,
            WorkflowEvent::HandoffRequested { .. } => EventKind::WorkflowHandoffRequested,
            WorkflowEvent::Submitted { .. } => EventKind::WorkflowSubmitted,
        }
    }
}

/// Immutable record of something that happened to a case's workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub case_id: String,
    /// User who triggered the change, if known
    pub user_id: Option<String>,
    pub workflow_instance_id: String,
    #[serde(flatten)]
    pub event: WorkflowEvent,
}

impl DomainEvent {
    pub fn new(
        case_id: &str,
        user_id: Option<&str>,
        workflow_instance_id: &str,
        event: WorkflowEvent,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            case_id: case_id.to_string(),
            user_id: user_id.map(str::to_string),
            workflow_instance_id: workflow_instance_id.to_string(),
            event,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = DomainEvent::new(
            "case-1",
            Some("user-1"),
            "wf-1",
            WorkflowEvent::StepSaved {
                step_id: "licensing".to_string(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "workflow_step_saved");
        assert_eq!(json["payload"]["step_id"], "licensing");
        assert_eq!(json["case_id"], "case-1");
        assert_eq!(json["user_id"], "user-1");
        assert_eq!(json["workflow_instance_id"], "wf-1");
    }

    #[test]
    fn serde_tag_matches_kind_name() {
        let event = DomainEvent::new("c", None, "w", WorkflowEvent::GroupSetupStarted);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.kind().as_str());
        assert!(json["user_id"].is_null());
    }

    #[test]
    fn every_event_gets_a_fresh_id() {
        let a = DomainEvent::new("c", None, "w", WorkflowEvent::OfflineSetupChosen);
        let b = DomainEvent::new("c", None, "w", WorkflowEvent::OfflineSetupChosen);
        assert_ne!(a.event_id, b.event_id);
    }
}
