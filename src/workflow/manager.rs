//! Workflow instance lifecycle: setup, employer handoff and submission.
//!
//! Step-level operations live in `step_ops`. Every mutating operation takes
//! the case lock, runs its read/validate/write sequence against the stores
//! without awaiting, releases the lock and only then publishes its event.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::case::{AccessStore, CaseStatus, CaseStore, Contact, Role};
use crate::events::{DomainEvent, EventPublisher, WorkflowEvent};
use crate::payload::{PayloadAssembler, ServicingPayload};

use super::definition::{DefinitionCatalog, WorkflowDefinition, GROUP_SETUP_WORKFLOW};
use super::error::{WorkflowError, WorkflowResult};
use super::locks::CaseLocks;
use super::models::*;
use super::progress;
use super::store::WorkflowStore;

/// Engine settings that are not part of the definition itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    /// Definition new instances bind to (its active version)
    pub definition_name: String,
    /// Step whose completion counts as the final signature
    pub authorization_step_id: String,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            definition_name: GROUP_SETUP_WORKFLOW.to_string(),
            authorization_step_id: "authorization".to_string(),
        }
    }
}

/// Case onboarding workflow engine.
pub struct WorkflowManager {
    pub(super) workflows: Arc<dyn WorkflowStore>,
    cases: Arc<dyn CaseStore>,
    access: Arc<dyn AccessStore>,
    catalog: Arc<DefinitionCatalog>,
    publisher: Arc<EventPublisher>,
    assembler: PayloadAssembler,
    pub(super) settings: WorkflowSettings,
    pub(super) locks: CaseLocks,
}

impl WorkflowManager {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        cases: Arc<dyn CaseStore>,
        access: Arc<dyn AccessStore>,
        catalog: Arc<DefinitionCatalog>,
        publisher: Arc<EventPublisher>,
        assembler: PayloadAssembler,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            workflows,
            cases,
            access,
            catalog,
            publisher,
            assembler,
            settings,
            locks: CaseLocks::new(),
        }
    }

    /// Start the guided online setup for a case.
    pub async fn start_online_setup(
        &self,
        case_id: &str,
        user_id: Option<&str>,
    ) -> WorkflowResult<WorkflowInstance> {
        let instance = {
            let _guard = self.locks.acquire(case_id).await?;
            self.create_instance(case_id, false)?
        };

        info!(
            "Started online setup for case {} ({} steps, instance {})",
            case_id,
            instance.steps.len(),
            instance.id
        );
        self.publish(&instance, user_id, WorkflowEvent::GroupSetupStarted)
            .await;
        Ok(instance)
    }

    /// Record that the case will be set up on paper. No steps are created.
    pub async fn start_offline_setup(
        &self,
        case_id: &str,
        user_id: Option<&str>,
    ) -> WorkflowResult<WorkflowInstance> {
        let instance = {
            let _guard = self.locks.acquire(case_id).await?;
            self.create_instance(case_id, true)?
        };

        info!(
            "Started offline setup for case {} (instance {})",
            case_id, instance.id
        );
        self.publish(&instance, user_id, WorkflowEvent::OfflineSetupChosen)
            .await;
        Ok(instance)
    }

    /// Hand the case over to the employer for their part of the setup.
    pub async fn request_employer_handoff(
        &self,
        case_id: &str,
        user_id: Option<&str>,
        broker_name: &str,
    ) -> WorkflowResult<HandoffResult> {
        let (instance, result, case_name) = {
            let _guard = self.locks.acquire(case_id).await?;

            let mut instance = self.load_instance(case_id)?;
            if !instance.status.accepts_handoff() {
                return Err(WorkflowError::InvalidState {
                    expected: format!(
                        "{}, {}",
                        WorkflowStatus::InProgress,
                        WorkflowStatus::PendingEmployer
                    ),
                    actual: instance.status,
                });
            }

            let definition = self.definition_for(&instance)?;
            let next_step = progress::next_employer_step(&instance, &definition)
                .ok_or(WorkflowError::NoEmployerStep)?;
            let contact = self.employer_contact(case_id)?;
            let case = self
                .cases
                .get_case(case_id)?
                .ok_or_else(|| WorkflowError::CaseNotFound(case_id.to_string()))?;

            instance.status = WorkflowStatus::PendingEmployer;
            self.workflows.save(&instance, &[])?;

            let result = HandoffResult {
                status: instance.status,
                employer_email: contact.email,
                employer_name: contact.name,
                next_step_id: next_step.step_id.clone(),
                next_step_name: next_step.name.clone(),
            };
            (instance, result, case.name)
        };

        info!(
            "Case {} handed off to employer {} at step {}",
            case_id, result.employer_email, result.next_step_id
        );
        self.publish(
            &instance,
            user_id,
            WorkflowEvent::HandoffRequested {
                employer_email: result.employer_email.clone(),
                employer_name: result.employer_name.clone(),
                case_name,
                next_step_id: result.next_step_id.clone(),
                next_step_name: result.next_step_name.clone(),
                broker_name: broker_name.to_string(),
            },
        )
        .await;
        Ok(result)
    }

    /// Finish the workflow and produce the servicing payload.
    ///
    /// Submitting an already completed workflow succeeds again and produces a
    /// fresh payload.
    pub async fn submit_workflow(
        &self,
        case_id: &str,
        user_id: Option<&str>,
    ) -> WorkflowResult<ServicingPayload> {
        let (instance, payload) = {
            let _guard = self.locks.acquire(case_id).await?;

            let mut instance = self.load_instance(case_id)?;
            let definition = self.definition_for(&instance)?;
            let missing = progress::incomplete_required_steps(&instance, &definition);
            if !missing.is_empty() {
                debug!(
                    "Rejecting submission of case {}: {} steps open",
                    case_id,
                    missing.len()
                );
                return Err(WorkflowError::IncompleteSteps(missing));
            }

            if instance.status != WorkflowStatus::Completed {
                instance.status = WorkflowStatus::Completed;
                instance.completed_at = Some(Utc::now());
                self.workflows.save(&instance, &[])?;
            }
            self.cases.update_status(case_id, CaseStatus::Submitted)?;

            let payload = self.assembler.assemble(&instance, Utc::now());
            (instance, payload)
        };

        info!("Workflow submitted for case {}", case_id);
        self.publish(
            &instance,
            user_id,
            WorkflowEvent::Submitted {
                payload: Box::new(payload.clone()),
            },
        )
        .await;
        Ok(payload)
    }

    /// Re-derive the payload of a completed workflow without changing anything.
    pub fn get_submission_payload(&self, case_id: &str) -> WorkflowResult<ServicingPayload> {
        let instance = self.load_instance(case_id)?;
        if instance.status != WorkflowStatus::Completed {
            return Err(WorkflowError::InvalidState {
                expected: WorkflowStatus::Completed.to_string(),
                actual: instance.status,
            });
        }
        Ok(self.assembler.assemble(&instance, Utc::now()))
    }

    /// The case's workflow with each step's name and allowed roles, or None if
    /// setup has not started.
    pub fn get_workflow(&self, case_id: &str) -> WorkflowResult<Option<WorkflowView>> {
        let Some(instance) = self.workflows.get_instance_by_case(case_id)? else {
            return Ok(None);
        };
        let definition = self.definition_for(&instance)?;

        let steps = instance
            .ordered_steps()
            .into_iter()
            .map(|step| {
                let step_definition = definition.step(&step.step_id);
                StepView {
                    step: step.clone(),
                    name: step_definition.map(|d| d.name.clone()),
                    allowed_roles: step_definition
                        .map(|d| d.allowed_roles.clone())
                        .unwrap_or_default(),
                }
            })
            .collect();

        Ok(Some(WorkflowView {
            id: instance.id,
            case_id: instance.case_id,
            status: instance.status,
            current_step_id: instance.current_step_id,
            is_offline: instance.is_offline,
            started_at: instance.started_at,
            completed_at: instance.completed_at,
            steps,
        }))
    }

    fn create_instance(&self, case_id: &str, offline: bool) -> WorkflowResult<WorkflowInstance> {
        if self.workflows.get_instance_by_case(case_id)?.is_some() {
            return Err(WorkflowError::AlreadyExists(case_id.to_string()));
        }
        let definition = self
            .catalog
            .active(&self.settings.definition_name)?
            .ok_or_else(|| WorkflowError::DefinitionNotFound(self.settings.definition_name.clone()))?;
        if self.cases.get_case(case_id)?.is_none() {
            return Err(WorkflowError::CaseNotFound(case_id.to_string()));
        }

        let mut instance = WorkflowInstance::new(case_id, &definition.name, definition.version);
        instance.started_at = Some(Utc::now());
        if offline {
            instance.status = WorkflowStatus::Offline;
            instance.is_offline = true;
        } else {
            instance.status = WorkflowStatus::InProgress;
            instance.steps = definition
                .steps
                .iter()
                .map(|s| {
                    StepInstance::new(
                        &instance.id,
                        &s.step_id,
                        s.order,
                        s.allowed_roles.first().copied(),
                    )
                })
                .collect();
            instance.current_step_id = definition.steps.first().map(|s| s.step_id.clone());
        }

        self.workflows.create_instance(&instance)?;
        self.cases
            .update_status(case_id, CaseStatus::ApplicationInProgress)?;
        Ok(instance)
    }

    fn employer_contact(&self, case_id: &str) -> WorkflowResult<Contact> {
        if let Some(access) = self
            .access
            .list_access_by_role(case_id, Role::Employer)?
            .into_iter()
            .next()
        {
            return Ok(access.into());
        }
        debug!(
            "No employer access on case {}, falling back to any employer user",
            case_id
        );
        self.access
            .find_user_by_role(Role::Employer)?
            .map(Contact::from)
            .ok_or_else(|| WorkflowError::NoEmployerContact(case_id.to_string()))
    }

    pub(super) fn load_instance(&self, case_id: &str) -> WorkflowResult<WorkflowInstance> {
        self.workflows
            .get_instance_by_case(case_id)?
            .ok_or_else(|| WorkflowError::InstanceNotFound(case_id.to_string()))
    }

    /// The exact definition version an instance was created from.
    fn definition_for(&self, instance: &WorkflowInstance) -> WorkflowResult<WorkflowDefinition> {
        self.catalog
            .get(&instance.definition_name, instance.definition_version)?
            .ok_or_else(|| {
                WorkflowError::DefinitionNotFound(format!(
                    "{} v{}",
                    instance.definition_name, instance.definition_version
                ))
            })
    }

    pub(super) async fn publish(
        &self,
        instance: &WorkflowInstance,
        user_id: Option<&str>,
        event: WorkflowEvent,
    ) {
        let event = DomainEvent::new(&instance.case_id, user_id, &instance.id, event);
        self.publisher.publish(event).await;
    }
}
