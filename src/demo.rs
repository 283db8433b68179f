//! Sample case driven through the whole online setup.

use anyhow::{bail, Result};
use serde_json::{json, Value};
use tracing::info;

use group_setup_server::case::{Case, CaseAccess, Role};
use group_setup_server::events::AuditLogStore;
use group_setup_server::payload::ServicingPayload;
use group_setup_server::workflow::{RequestContext, StepData};
use group_setup_server::App;

const CASE_ID: &str = "demo-case";
const BROKER_ID: &str = "demo-broker";
const EMPLOYER_ID: &str = "demo-employer";

pub async fn run(app: &App) -> Result<ServicingPayload> {
    app.cases.insert(Case::new(CASE_ID, "Acme Corporation"))?;
    app.access.grant(CaseAccess {
        case_id: CASE_ID.to_string(),
        role: Role::Employer,
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        email: "jane.doe@acme.test".to_string(),
    })?;

    let manager = &app.manager;
    let instance = manager.start_online_setup(CASE_ID, Some(BROKER_ID)).await?;
    info!("Demo case {} started ({})", CASE_ID, instance.id);

    let broker_steps = [
        ("licensing", json!({"writing_agent_number": "WA-1001", "appointed": true})),
        ("company_info", json!({"legal_name": "Acme Corporation", "tax_id": "12-3456789"})),
    ];
    for (step_id, data) in broker_steps {
        manager
            .save_step_data(CASE_ID, step_id, step_data(data)?, Some(BROKER_ID))
            .await?;
        manager
            .complete_step(CASE_ID, step_id, Some(BROKER_ID), &RequestContext::default())
            .await?;
    }

    let handoff = manager
        .request_employer_handoff(CASE_ID, Some(BROKER_ID), "John Broker")
        .await?;
    info!(
        "Handed off to {} for {}",
        handoff.employer_email, handoff.next_step_name
    );

    let employer_steps = [
        ("risk_assessment", json!({"industry": "manufacturing", "employees": 120})),
        ("commission_ack", json!({"acknowledged": true})),
        ("renewal_period", json!({"renewal_notification_period": 60})),
        ("group_structure", json!({"classes": [{"name": "Salaried"}, {"name": "Hourly"}]})),
        (
            "billing_setup",
            json!({
                "billing": {
                    "billing_model": "list_bill",
                    "billing_frequency": "monthly",
                    "responsible_entity": "employer",
                    "receive_billing_by_mail": false,
                    "wants_initial_premium": "yes",
                    "initial_premium_amount": 2500,
                    "payment_channel": "ach",
                    "payment_confirmed": true
                },
                "confirmation": {"confirmation_number": "CONF-2024-001"}
            }),
        ),
        (
            "authorization",
            json!({
                "online_access": {"broker_online_access": "full"},
                "privacy_notice": {"privacy_notice_acknowledged": true},
                "intermediary": {"producer_compensation_acknowledged": true},
                "third_party_billing": {"agreement_reviewed": true},
                "gross_up": {"gross_up_acknowledged": true},
                "hipaa": {"hipaa_terms_accepted": true, "document_ids": ["hipaa-001"]},
                "disability_tax": {"ltd_terms_accepted": true},
                "cert_beneficial": {"portability_agreement_acknowledged": true},
                "no_claims": {"customer_esign": true},
                "final_signature": {
                    "accepted_by": "Jane Doe",
                    "signature_date": "2024-06-01",
                    "client_timestamp": "2024-06-01T15:04:05Z"
                }
            }),
        ),
        ("finalize", json!({"reviewed": true})),
        ("master_app", json!({"signed": true})),
    ];
    let context = RequestContext::new("203.0.113.7", "group-setup-demo/1.0");
    for (step_id, data) in employer_steps {
        manager
            .save_step_data(CASE_ID, step_id, step_data(data)?, Some(EMPLOYER_ID))
            .await?;
        manager
            .complete_step(CASE_ID, step_id, Some(EMPLOYER_ID), &context)
            .await?;
    }

    let payload = manager.submit_workflow(CASE_ID, Some(EMPLOYER_ID)).await?;
    info!(
        "Demo case submitted with {} audit entries",
        app.audit_log.entries_for_case(CASE_ID)?.len()
    );
    Ok(payload)
}

fn step_data(value: Value) -> Result<StepData> {
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("Step data must be an object, got {}", other),
    }
}
