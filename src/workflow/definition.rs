//! Workflow definitions.
//!
//! A definition is an immutable, versioned template listing the ordered steps of a
//! workflow together with the roles allowed to work on each step. The
//! [`DefinitionCatalog`] keeps every registered version and tracks which one is
//! active for each workflow name.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::case::Role;

/// Name of the built-in group setup workflow.
pub const GROUP_SETUP_WORKFLOW: &str = "group_setup";

/// A single step of a workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub step_id: String,
    pub order: i32,
    pub name: String,
    pub allowed_roles: Vec<Role>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl StepDefinition {
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// Versioned workflow template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub is_active: bool,
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    /// Load a definition from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read workflow definition: {:?}", path))?;
        let definition: WorkflowDefinition = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse workflow definition: {:?}", path))?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check structural invariants: at least one step, unique step ids and
    /// unique, strictly ascending orders.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            bail!("Workflow definition {} v{} has no steps", self.name, self.version);
        }
        let mut seen = std::collections::HashSet::new();
        let mut previous_order: Option<i32> = None;
        for step in &self.steps {
            if !seen.insert(step.step_id.as_str()) {
                bail!(
                    "Workflow definition {} v{} has duplicate step id {}",
                    self.name,
                    self.version,
                    step.step_id
                );
            }
            if let Some(previous) = previous_order {
                if step.order <= previous {
                    bail!(
                        "Workflow definition {} v{}: step {} has order {} which is not greater than {}",
                        self.name,
                        self.version,
                        step.step_id,
                        step.order,
                        previous
                    );
                }
            }
            previous_order = Some(step.order);
        }
        Ok(())
    }

    pub fn step(&self, step_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// Ids of every step flagged as required, in definition order.
    pub fn required_step_ids(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|s| s.required)
            .map(|s| s.step_id.as_str())
            .collect()
    }

    /// The ten-step insurance group setup workflow.
    pub fn group_setup() -> Self {
        use Role::*;
        let brokers = [Broker, GeneralAgent, ThirdPartyAdmin];
        let everyone = [Broker, GeneralAgent, ThirdPartyAdmin, Employer];
        let step = |step_id: &str, order: i32, name: &str, roles: &[Role]| StepDefinition {
            step_id: step_id.to_string(),
            order,
            name: name.to_string(),
            allowed_roles: roles.to_vec(),
            required: true,
        };

        WorkflowDefinition {
            name: GROUP_SETUP_WORKFLOW.to_string(),
            version: 1,
            is_active: true,
            steps: vec![
                step("licensing", 1, "Licensing/Appointment", &brokers),
                step("company_info", 2, "Company Information", &everyone),
                step("risk_assessment", 3, "Risk Assessment", &everyone),
                step("commission_ack", 4, "Commission Agreement", &brokers),
                step("renewal_period", 5, "Renewal Period", &everyone),
                step("group_structure", 6, "Group Structure", &everyone),
                step("billing_setup", 7, "Billing Setup", &everyone),
                step("authorization", 8, "Authorization", &[Employer]),
                step("finalize", 9, "Finalize", &everyone),
                step("master_app", 10, "Master Application", &[Employer]),
            ],
        }
    }
}

/// Registry of workflow definitions, keyed by name and version.
#[derive(Default)]
pub struct DefinitionCatalog {
    definitions: RwLock<HashMap<String, Vec<WorkflowDefinition>>>,
}

impl DefinitionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog holding the built-in group setup definition.
    pub fn with_group_setup() -> Result<Self> {
        let catalog = Self::new();
        catalog.register(WorkflowDefinition::group_setup())?;
        Ok(catalog)
    }

    /// Register a definition version. If it is flagged active, every other
    /// version with the same name is deactivated.
    pub fn register(&self, definition: WorkflowDefinition) -> Result<()> {
        definition.validate()?;
        let mut definitions = self.definitions.write().map_err(poisoned)?;
        let versions = definitions.entry(definition.name.clone()).or_default();
        if versions.iter().any(|d| d.version == definition.version) {
            bail!(
                "Workflow definition {} v{} is already registered",
                definition.name,
                definition.version
            );
        }
        if definition.is_active {
            for other in versions.iter_mut() {
                other.is_active = false;
            }
        }
        info!(
            "Registered workflow definition {} v{} ({} steps, active: {})",
            definition.name,
            definition.version,
            definition.steps.len(),
            definition.is_active
        );
        versions.push(definition);
        Ok(())
    }

    /// Make the given version the only active one for its name.
    pub fn activate(&self, name: &str, version: u32) -> Result<()> {
        let mut definitions = self.definitions.write().map_err(poisoned)?;
        let versions = definitions
            .get_mut(name)
            .with_context(|| format!("Unknown workflow definition {}", name))?;
        if !versions.iter().any(|d| d.version == version) {
            bail!("Unknown workflow definition {} v{}", name, version);
        }
        for definition in versions.iter_mut() {
            definition.is_active = definition.version == version;
        }
        info!("Activated workflow definition {} v{}", name, version);
        Ok(())
    }

    /// The currently active definition for a name, if any.
    pub fn active(&self, name: &str) -> Result<Option<WorkflowDefinition>> {
        let definitions = self.definitions.read().map_err(poisoned)?;
        Ok(definitions
            .get(name)
            .and_then(|versions| versions.iter().find(|d| d.is_active))
            .cloned())
    }

    /// A specific version, regardless of whether it is active.
    pub fn get(&self, name: &str, version: u32) -> Result<Option<WorkflowDefinition>> {
        let definitions = self.definitions.read().map_err(poisoned)?;
        Ok(definitions
            .get(name)
            .and_then(|versions| versions.iter().find(|d| d.version == version))
            .cloned())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> anyhow::Error {
    anyhow::anyhow!("Definition catalog lock poisoned")
}
