mod file_config;

pub use file_config::{FileConfig, HandlersConfig, StepsConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::payload::PayloadAssembler;
use crate::workflow::{WorkflowSettings, GROUP_SETUP_WORKFLOW};

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub definition_name: Option<String>,
    pub definition_path: Option<PathBuf>,
    pub disable_audit: bool,
    pub disable_notifications: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub definition_name: String,
    /// JSON definition to load instead of the built-in one
    pub definition_path: Option<PathBuf>,
    pub steps: StepSettings,
    pub audit_enabled: bool,
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSettings {
    pub authorization: String,
    pub renewal: String,
    pub billing: String,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            authorization: "authorization".to_string(),
            renewal: "renewal_period".to_string(),
            billing: "billing_setup".to_string(),
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let definition_name = file
            .definition_name
            .or_else(|| cli.definition_name.clone())
            .unwrap_or_else(|| GROUP_SETUP_WORKFLOW.to_string());
        if definition_name.trim().is_empty() {
            bail!("definition_name must not be empty");
        }

        let definition_path = file
            .definition_path
            .map(PathBuf::from)
            .or_else(|| cli.definition_path.clone());
        if let Some(path) = &definition_path {
            if !path.is_file() {
                bail!("Workflow definition file does not exist: {:?}", path);
            }
        }

        let steps_file = file.steps.unwrap_or_default();
        let defaults = StepSettings::default();
        let steps = StepSettings {
            authorization: steps_file.authorization.unwrap_or(defaults.authorization),
            renewal: steps_file.renewal.unwrap_or(defaults.renewal),
            billing: steps_file.billing.unwrap_or(defaults.billing),
        };

        let handlers = file.handlers.unwrap_or_default();
        let audit_enabled = handlers.audit_enabled.unwrap_or(!cli.disable_audit);
        let notifications_enabled = handlers
            .notifications_enabled
            .unwrap_or(!cli.disable_notifications);

        Ok(Self {
            definition_name,
            definition_path,
            steps,
            audit_enabled,
            notifications_enabled,
        })
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            definition_name: self.definition_name.clone(),
            authorization_step_id: self.steps.authorization.clone(),
        }
    }

    pub fn payload_assembler(&self) -> PayloadAssembler {
        PayloadAssembler::new(
            self.steps.renewal.clone(),
            self.steps.billing.clone(),
            self.steps.authorization.clone(),
        )
    }
}
