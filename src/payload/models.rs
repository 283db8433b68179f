//! Servicing payload handed to downstream systems once a workflow is submitted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::workflow::StepData;

/// Normalized output of a submitted workflow.
///
/// Derived on demand from the step data of a completed instance and never
/// stored. Two assemblies of the same instance only differ by `submitted_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicingPayload {
    pub client_id: String,
    pub workflow_instance_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Copied verbatim from the renewal step, null when not captured
    pub renewal_notification_period: Option<Value>,
    pub billing: Option<BillingSummary>,
    pub authorization: Option<AuthorizationSummary>,
    /// Raw data of every step that captured any, keyed by step id
    pub steps: BTreeMap<String, StepData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSummary {
    pub billing_model: Option<Value>,
    pub billing_frequency: Option<Value>,
    pub responsible_entity: Option<Value>,
    pub self_admin_config: Option<Value>,
    pub receive_billing_by_mail: Option<Value>,
    pub initial_premium: InitialPremium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialPremium {
    pub requested: bool,
    pub amount: Option<Value>,
    pub channel: Option<Value>,
    pub payment_confirmed: bool,
    pub confirmation: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationSummary {
    pub accepted_by: Option<Value>,
    pub signature_date: Option<Value>,
    /// Stamped by the server when the authorization step was completed
    pub server_timestamp: Option<Value>,
    pub client_timestamp: Option<Value>,
    pub signer_ip: Option<Value>,
    pub signer_user_agent: Option<Value>,
    pub sections_completed: SectionsCompleted,
    pub hipaa_document_ids: Vec<Value>,
}

/// Which acknowledgment sections of the authorization step were completed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionsCompleted {
    pub online_access: bool,
    pub privacy_notice: bool,
    pub intermediary: bool,
    pub third_party_billing: bool,
    pub gross_up: bool,
    pub hipaa: bool,
    pub disability_tax: bool,
    pub cert_beneficial: bool,
    pub no_claims: bool,
}
