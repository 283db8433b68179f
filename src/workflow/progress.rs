//! Cursor and completion rules over the steps of an instance.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::case::Role;
use crate::payload::FINAL_SIGNATURE_FIELD;

use super::definition::{StepDefinition, WorkflowDefinition};
use super::models::{RequestContext, StepData, StepInstance, WorkflowInstance};

/// Where the cursor goes after the step at `completed_order` was completed.
///
/// The first non-terminal step after the completed one wins. When every later
/// step is terminal the cursor wraps back to the first non-terminal step, and
/// it is None once nothing is left.
pub fn next_cursor(instance: &WorkflowInstance, completed_order: i32) -> Option<String> {
    let open: Vec<&StepInstance> = instance
        .ordered_steps()
        .into_iter()
        .filter(|s| !s.status.is_terminal())
        .collect();

    open.iter()
        .find(|s| s.step_order > completed_order)
        .or_else(|| open.first())
        .map(|s| s.step_id.clone())
}

/// Required steps of `definition` that are missing or not yet terminal, in
/// definition order.
pub fn incomplete_required_steps(
    instance: &WorkflowInstance,
    definition: &WorkflowDefinition,
) -> Vec<String> {
    definition
        .required_step_ids()
        .into_iter()
        .filter(|id| !instance.step(id).is_some_and(|s| s.status.is_terminal()))
        .map(str::to_string)
        .collect()
}

/// First open step, by order, that the employer is allowed to work on.
pub fn next_employer_step<'a>(
    instance: &WorkflowInstance,
    definition: &'a WorkflowDefinition,
) -> Option<&'a StepDefinition> {
    instance
        .ordered_steps()
        .into_iter()
        .filter(|s| !s.status.is_terminal())
        .filter_map(|s| definition.step(&s.step_id))
        .find(|d| d.allows(Role::Employer))
}

/// Record server-side signer metadata in the step's signature object.
///
/// Fields written by the client (`accepted_by`, `signature_date`...) are left
/// as they are.
pub fn stamp_signature(data: &mut Option<StepData>, context: &RequestContext, now: DateTime<Utc>) {
    let data = data.get_or_insert_with(StepData::new);
    let signature = data
        .entry(FINAL_SIGNATURE_FIELD)
        .or_insert_with(|| Value::Object(StepData::new()));
    if !signature.is_object() {
        *signature = Value::Object(StepData::new());
    }
    if let Value::Object(signature) = signature {
        signature.insert(
            "server_timestamp".to_string(),
            Value::String(now.to_rfc3339()),
        );
        signature.insert("signer_ip".to_string(), optional_string(&context.ip));
        signature.insert(
            "signer_user_agent".to_string(),
            optional_string(&context.user_agent),
        );
    }
}

fn optional_string(value: &Option<String>) -> Value {
    value.clone().map_or(Value::Null, Value::String)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::models::StepStatus;
    use serde_json::json;

    fn instance(statuses: &[(&str, i32, StepStatus)]) -> WorkflowInstance {
        let mut instance = WorkflowInstance::new("case-1", "wf", 1);
        for (id, order, status) in statuses {
            let mut step = StepInstance::new(&instance.id, id, *order, None);
            step.status = *status;
            instance.steps.push(step);
        }
        instance
    }

    #[test]
    fn cursor_moves_forward_to_next_open_step() {
        let instance = instance(&[
            ("a", 1, StepStatus::Completed),
            ("b", 2, StepStatus::Skipped),
            ("c", 3, StepStatus::Pending),
            ("d", 4, StepStatus::InProgress),
        ]);
        assert_eq!(next_cursor(&instance, 1).as_deref(), Some("c"));
    }

    #[test]
    fn cursor_wraps_back_to_earliest_open_step() {
        let instance = instance(&[
            ("a", 1, StepStatus::Pending),
            ("b", 2, StepStatus::Completed),
            ("c", 3, StepStatus::Completed),
        ]);
        assert_eq!(next_cursor(&instance, 3).as_deref(), Some("a"));
    }

    #[test]
    fn cursor_is_none_when_everything_is_terminal() {
        let instance = instance(&[
            ("a", 1, StepStatus::Completed),
            ("b", 2, StepStatus::NotApplicable),
        ]);
        assert_eq!(next_cursor(&instance, 2), None);
    }

    #[test]
    fn cursor_ignores_storage_order() {
        let instance = instance(&[
            ("c", 3, StepStatus::Pending),
            ("a", 1, StepStatus::Completed),
            ("b", 2, StepStatus::Pending),
        ]);
        assert_eq!(next_cursor(&instance, 1).as_deref(), Some("b"));
    }

    #[test]
    fn offline_instance_misses_every_required_step() {
        let definition = WorkflowDefinition::group_setup();
        let offline = WorkflowInstance::new("case-1", &definition.name, definition.version);
        assert_eq!(
            incomplete_required_steps(&offline, &definition).len(),
            definition.steps.len()
        );
    }

    #[test]
    fn optional_steps_are_not_reported() {
        let mut definition = WorkflowDefinition::group_setup();
        definition.steps.truncate(2);
        definition.steps[1].required = false;
        let instance = instance(&[
            ("licensing", 1, StepStatus::InProgress),
            ("company_info", 2, StepStatus::Pending),
        ]);
        assert_eq!(
            incomplete_required_steps(&instance, &definition),
            vec!["licensing".to_string()]
        );
    }

    #[test]
    fn employer_step_skips_terminal_and_broker_only_steps() {
        let definition = WorkflowDefinition::group_setup();
        let instance = instance(&[
            ("licensing", 1, StepStatus::Pending),
            ("company_info", 2, StepStatus::Completed),
            ("risk_assessment", 3, StepStatus::Pending),
        ]);
        let step = next_employer_step(&instance, &definition).unwrap();
        assert_eq!(step.step_id, "risk_assessment");
    }

    #[test]
    fn signature_keeps_client_fields() {
        let mut data = Some(
            json!({"final_signature": {"accepted_by": "Jane Doe"}, "hipaa": {"x": 1}})
                .as_object()
                .unwrap()
                .clone(),
        );
        let now = Utc::now();
        stamp_signature(&mut data, &RequestContext::new("10.0.0.1", "ua/1.0"), now);

        let data = data.unwrap();
        let signature = &data[FINAL_SIGNATURE_FIELD];
        assert_eq!(signature["accepted_by"], "Jane Doe");
        assert_eq!(signature["signer_ip"], "10.0.0.1");
        assert_eq!(signature["signer_user_agent"], "ua/1.0");
        assert_eq!(signature["server_timestamp"], now.to_rfc3339());
        assert_eq!(data["hipaa"]["x"], 1);
    }

    #[test]
    fn signature_is_created_when_missing() {
        let mut data = None;
        stamp_signature(&mut data, &RequestContext::default(), Utc::now());

        let data = data.unwrap();
        assert!(data[FINAL_SIGNATURE_FIELD]["server_timestamp"].is_string());
        assert!(data[FINAL_SIGNATURE_FIELD]["signer_ip"].is_null());
    }
}
