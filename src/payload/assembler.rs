//! Builds the servicing payload from the step data of a workflow instance.
//!
//! Every step keeps its own free-form schema. The knowledge of which nested
//! fields matter downstream lives only here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflow::{StepData, WorkflowInstance};

use super::models::{
    AuthorizationSummary, BillingSummary, InitialPremium, SectionsCompleted, ServicingPayload,
};

/// Nested object of the authorization step that carries the signature.
pub const FINAL_SIGNATURE_FIELD: &str = "final_signature";

const RENEWAL_PERIOD_FIELD: &str = "renewal_notification_period";

/// Step ids whose data is normalized into dedicated payload sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadAssembler {
    pub renewal_step_id: String,
    pub billing_step_id: String,
    pub authorization_step_id: String,
}

impl Default for PayloadAssembler {
    fn default() -> Self {
        Self {
            renewal_step_id: "renewal_period".to_string(),
            billing_step_id: "billing_setup".to_string(),
            authorization_step_id: "authorization".to_string(),
        }
    }
}

impl PayloadAssembler {
    pub fn new(
        renewal_step_id: impl Into<String>,
        billing_step_id: impl Into<String>,
        authorization_step_id: impl Into<String>,
    ) -> Self {
        Self {
            renewal_step_id: renewal_step_id.into(),
            billing_step_id: billing_step_id.into(),
            authorization_step_id: authorization_step_id.into(),
        }
    }

    /// Assemble the payload. Has no side effects; `submitted_at` is the only
    /// input that is not derived from the instance.
    pub fn assemble(
        &self,
        instance: &WorkflowInstance,
        submitted_at: DateTime<Utc>,
    ) -> ServicingPayload {
        let mut steps = BTreeMap::new();
        for step in instance.ordered_steps().into_iter().filter(|s| s.has_data()) {
            if let Some(data) = &step.data {
                steps.insert(step.step_id.clone(), data.clone());
            }
        }

        let renewal_notification_period = steps
            .get(&self.renewal_step_id)
            .and_then(|data| field(data, RENEWAL_PERIOD_FIELD));

        let billing = steps.get(&self.billing_step_id).map(billing_summary);
        let authorization = steps
            .get(&self.authorization_step_id)
            .map(authorization_summary);

        ServicingPayload {
            client_id: instance.case_id.clone(),
            workflow_instance_id: instance.id.clone(),
            submitted_at,
            renewal_notification_period,
            billing,
            authorization,
            steps,
        }
    }
}

fn billing_summary(data: &StepData) -> BillingSummary {
    let billing = nested(data, "billing");
    let get = |key: &str| billing.and_then(|b| field(b, key));

    let requested = get("wants_initial_premium")
        .as_ref()
        .and_then(Value::as_str)
        == Some("yes");

    BillingSummary {
        billing_model: get("billing_model"),
        billing_frequency: get("billing_frequency"),
        responsible_entity: get("responsible_entity"),
        self_admin_config: get("self_admin_config"),
        receive_billing_by_mail: get("receive_billing_by_mail"),
        initial_premium: InitialPremium {
            requested,
            amount: get("initial_premium_amount"),
            channel: get("payment_channel"),
            payment_confirmed: get("payment_confirmed")
                .as_ref()
                .and_then(Value::as_bool)
                .unwrap_or(false),
            confirmation: field(data, "confirmation"),
        },
    }
}

fn authorization_summary(data: &StepData) -> AuthorizationSummary {
    let signature = nested(data, FINAL_SIGNATURE_FIELD);
    let get = |key: &str| signature.and_then(|s| field(s, key));

    let acknowledged = |section: &str, key: &str| {
        nested(data, section)
            .and_then(|s| s.get(key))
            .is_some_and(is_truthy)
    };

    let hipaa_document_ids = nested(data, "hipaa")
        .and_then(|h| h.get("document_ids"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    AuthorizationSummary {
        accepted_by: get("accepted_by"),
        signature_date: get("signature_date"),
        server_timestamp: get("server_timestamp"),
        client_timestamp: get("client_timestamp"),
        signer_ip: get("signer_ip"),
        signer_user_agent: get("signer_user_agent"),
        sections_completed: SectionsCompleted {
            online_access: acknowledged("online_access", "broker_online_access"),
            privacy_notice: acknowledged("privacy_notice", "privacy_notice_acknowledged"),
            intermediary: acknowledged("intermediary", "producer_compensation_acknowledged"),
            third_party_billing: acknowledged("third_party_billing", "agreement_reviewed"),
            gross_up: acknowledged("gross_up", "gross_up_acknowledged"),
            hipaa: acknowledged("hipaa", "hipaa_terms_accepted"),
            disability_tax: acknowledged("disability_tax", "ltd_terms_accepted"),
            cert_beneficial: acknowledged("cert_beneficial", "portability_agreement_acknowledged"),
            no_claims: acknowledged("no_claims", "customer_esign"),
        },
        hipaa_document_ids,
    }
}

fn nested<'a>(data: &'a StepData, key: &str) -> Option<&'a StepData> {
    data.get(key).and_then(Value::as_object)
}

/// A field value, with explicit nulls folded into absence.
fn field(data: &StepData, key: &str) -> Option<Value> {
    data.get(key).filter(|v| !v.is_null()).cloned()
}

/// Acknowledgments arrive as booleans, but selection-style sections store a
/// chosen option string instead.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}
