//! Common test infrastructure
//!
//! Builds a fully wired engine over in-memory stores, with the audit and
//! handoff notification handlers subscribed.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestEngine, CASE_ID};
//!
//! #[tokio::test]
//! async fn test_start() {
//!     let engine = TestEngine::group_setup();
//!     engine.manager().start_online_setup(CASE_ID, None).await.unwrap();
//! }
//! ```

#![allow(dead_code)]

use std::sync::Arc;

use group_setup_server::case::{Case, CaseAccess, CaseStatus, CaseStore, Role, UserContact};
use group_setup_server::config::{AppConfig, CliConfig};
use group_setup_server::events::AuditLogStore;
use group_setup_server::workflow::{
    DefinitionCatalog, StepData, StepDefinition, WorkflowDefinition, WorkflowManager,
    GROUP_SETUP_WORKFLOW,
};
use group_setup_server::App;
use serde_json::Value;

pub const CASE_ID: &str = "case-acme";
pub const CASE_NAME: &str = "Acme Corporation";
pub const BROKER: Option<&str> = Some("user-broker");
pub const EMPLOYER: Option<&str> = Some("user-employer");
pub const EMPLOYER_EMAIL: &str = "jane.doe@acme.test";

pub struct TestEngine {
    pub app: App,
    pub catalog: Arc<DefinitionCatalog>,
}

impl TestEngine {
    /// Engine running the built-in ten-step group setup, with one case.
    pub fn group_setup() -> Self {
        Self::with_definition(WorkflowDefinition::group_setup())
    }

    /// Engine running a three-step definition: a(1), b(2) and c(3). Only c
    /// is open to the employer.
    pub fn three_steps() -> Self {
        Self::with_definition(three_step_definition())
    }

    pub fn with_definition(definition: WorkflowDefinition) -> Self {
        let catalog = DefinitionCatalog::new();
        catalog.register(definition).unwrap();
        Self::with_catalog(catalog)
    }

    pub fn with_catalog(catalog: DefinitionCatalog) -> Self {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();
        let catalog = Arc::new(catalog);
        let app = App::build(&config, catalog.clone());
        app.cases.insert(Case::new(CASE_ID, CASE_NAME)).unwrap();
        Self { app, catalog }
    }

    pub fn manager(&self) -> &WorkflowManager {
        &self.app.manager
    }

    pub fn grant_employer_access(&self) {
        self.app
            .access
            .grant(CaseAccess {
                case_id: CASE_ID.to_string(),
                role: Role::Employer,
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                email: EMPLOYER_EMAIL.to_string(),
            })
            .unwrap();
    }

    pub fn add_employer_user(&self, email: &str) {
        self.app
            .access
            .add_user(UserContact {
                id: "user-fallback".to_string(),
                role: Role::Employer,
                first_name: "Sam".to_string(),
                last_name: "Fallback".to_string(),
                email: email.to_string(),
            })
            .unwrap();
    }

    pub fn case_status(&self) -> CaseStatus {
        self.app.cases.get_case(CASE_ID).unwrap().unwrap().status
    }

    /// Event type names recorded by the audit handler, oldest first.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.app
            .audit_log
            .entries_for_case(CASE_ID)
            .unwrap()
            .into_iter()
            .map(|e| e.event_type)
            .collect()
    }
}

pub fn three_step_definition() -> WorkflowDefinition {
    let step = |step_id: &str, order: i32, roles: Vec<Role>| StepDefinition {
        step_id: step_id.to_string(),
        order,
        name: format!("Step {}", step_id.to_uppercase()),
        allowed_roles: roles,
        required: true,
    };
    WorkflowDefinition {
        name: GROUP_SETUP_WORKFLOW.to_string(),
        version: 1,
        is_active: true,
        steps: vec![
            step("a", 1, vec![Role::Broker]),
            step("b", 2, vec![Role::Broker]),
            step("c", 3, vec![Role::Broker, Role::Employer]),
        ],
    }
}

/// Step data from a JSON object literal.
pub fn data(value: Value) -> StepData {
    value.as_object().cloned().unwrap()
}
