//! Wiring of the engine with in-memory stores and the standard handlers.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::case::{InMemoryAccessStore, InMemoryCaseStore};
use crate::config::AppConfig;
use crate::events::{
    AuditHandler, ConsoleDispatcher, EventKind, EventPublisher, HandoffNotificationHandler,
    InMemoryAuditLog,
};
use crate::workflow::{DefinitionCatalog, InMemoryWorkflowStore, WorkflowDefinition, WorkflowManager};

/// A fully wired engine together with the stores behind it.
pub struct App {
    pub manager: WorkflowManager,
    pub cases: Arc<InMemoryCaseStore>,
    pub access: Arc<InMemoryAccessStore>,
    pub workflows: Arc<InMemoryWorkflowStore>,
    pub audit_log: Arc<InMemoryAuditLog>,
    pub dispatcher: Arc<ConsoleDispatcher>,
}

impl App {
    /// Build the engine over fresh in-memory stores. Handlers are subscribed
    /// here, before the publisher is shared.
    pub fn build(config: &AppConfig, catalog: Arc<DefinitionCatalog>) -> Self {
        let cases = Arc::new(InMemoryCaseStore::new());
        let access = Arc::new(InMemoryAccessStore::new());
        let workflows = Arc::new(InMemoryWorkflowStore::new());
        let audit_log = Arc::new(InMemoryAuditLog::new());
        let dispatcher = Arc::new(ConsoleDispatcher::new());

        let mut publisher = EventPublisher::new();
        if config.audit_enabled {
            publisher.subscribe_all(Arc::new(AuditHandler::new(audit_log.clone())));
        } else {
            warn!("Audit handler disabled, events will not be recorded");
        }
        if config.notifications_enabled {
            publisher.subscribe(
                EventKind::WorkflowHandoffRequested,
                Arc::new(HandoffNotificationHandler::new(dispatcher.clone())),
            );
        } else {
            warn!("Handoff notifications disabled");
        }

        let manager = WorkflowManager::new(
            workflows.clone(),
            cases.clone(),
            access.clone(),
            catalog,
            Arc::new(publisher),
            config.payload_assembler(),
            config.workflow_settings(),
        );

        Self {
            manager,
            cases,
            access,
            workflows,
            audit_log,
            dispatcher,
        }
    }
}

/// Build the definition catalog: the built-in group setup definition, or the
/// JSON file named in the config, which becomes the active version.
pub fn load_catalog(config: &AppConfig) -> Result<DefinitionCatalog> {
    let Some(path) = &config.definition_path else {
        info!("Using built-in group setup workflow definition");
        return DefinitionCatalog::with_group_setup();
    };

    let mut definition = WorkflowDefinition::load(path)?;
    if definition.name != config.definition_name {
        bail!(
            "Workflow definition {:?} is named {}, expected {}",
            path,
            definition.name,
            config.definition_name
        );
    }
    if !definition.is_active {
        warn!(
            "Workflow definition {} v{} is not flagged active, activating it",
            definition.name, definition.version
        );
        definition.is_active = true;
    }

    let catalog = DefinitionCatalog::new();
    catalog.register(definition)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CliConfig;
    use crate::events::AuditLogStore;
    use std::io::Write;

    #[test]
    fn built_in_catalog_by_default() {
        let config = AppConfig::resolve(&CliConfig::default(), None).unwrap();
        let catalog = load_catalog(&config).unwrap();
        let active = catalog.active(&config.definition_name).unwrap().unwrap();
        assert_eq!(active.steps.len(), 10);
    }

    #[test]
    fn definition_file_is_activated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "group_setup", "version": 4, "steps": [
                {{"step_id": "only", "order": 1, "name": "Only", "allowed_roles": ["EMPLOYER"]}}
            ]}}"#
        )
        .unwrap();
        let cli = CliConfig {
            definition_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();

        let catalog = load_catalog(&config).unwrap();
        let active = catalog.active("group_setup").unwrap().unwrap();
        assert_eq!(active.version, 4);
        assert!(active.steps[0].required);
    }

    #[test]
    fn definition_file_with_other_name_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "other", "version": 1, "is_active": true, "steps": [
                {{"step_id": "only", "order": 1, "name": "Only", "allowed_roles": []}}
            ]}}"#
        )
        .unwrap();
        let cli = CliConfig {
            definition_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        assert!(load_catalog(&config).is_err());
    }

    #[tokio::test]
    async fn disabled_handlers_are_not_subscribed() {
        let cli = CliConfig {
            disable_audit: true,
            disable_notifications: true,
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();
        let app = App::build(&config, Arc::new(load_catalog(&config).unwrap()));

        app.cases
            .insert(crate::case::Case::new("case-1", "Acme"))
            .unwrap();
        app.manager.start_online_setup("case-1", None).await.unwrap();

        assert!(app.audit_log.entries_for_case("case-1").unwrap().is_empty());
    }
}
