//! Step-level operations: save, complete, skip and read.

use chrono::Utc;
use tracing::{debug, info};

use crate::events::WorkflowEvent;

use super::error::{WorkflowError, WorkflowResult};
use super::manager::WorkflowManager;
use super::models::*;
use super::progress;

impl WorkflowManager {
    /// Store the data of a step, replacing what was there.
    ///
    /// A pending step moves to in progress and becomes the current step.
    /// Completed steps may still be edited, except for the signed
    /// authorization step.
    pub async fn save_step_data(
        &self,
        case_id: &str,
        step_id: &str,
        data: StepData,
        user_id: Option<&str>,
    ) -> WorkflowResult<StepInstance> {
        let (instance, step) = {
            let _guard = self.locks.acquire(case_id).await?;

            let mut instance = self.load_instance(case_id)?;
            let current = self.open_step(&instance, step_id)?;
            match current.status {
                StepStatus::Skipped | StepStatus::NotApplicable => {
                    return Err(WorkflowError::InvalidStepState {
                        step_id: step_id.to_string(),
                        status: current.status,
                        action: "saved",
                    });
                }
                _ => {}
            }

            let now = Utc::now();
            let started = current.status == StepStatus::Pending;
            let step = {
                let step = instance
                    .step_mut(step_id)
                    .ok_or_else(|| WorkflowError::StepNotFound(step_id.to_string()))?;
                step.data = Some(data);
                step.last_saved_at = Some(now);
                if started {
                    step.status = StepStatus::InProgress;
                    step.started_at.get_or_insert(now);
                }
                step.clone()
            };
            if started {
                instance.current_step_id = Some(step_id.to_string());
            }
            self.workflows.save(&instance, std::slice::from_ref(&step))?;
            (instance, step)
        };

        debug!(
            "Saved data for step {} of case {} ({})",
            step_id, case_id, step.status
        );
        self.publish(
            &instance,
            user_id,
            WorkflowEvent::StepSaved {
                step_id: step_id.to_string(),
            },
        )
        .await;
        Ok(step)
    }

    /// Mark a step completed and move the cursor on.
    ///
    /// Completing the authorization step stamps the signer metadata from
    /// `context`. When no open step remains the whole workflow completes.
    pub async fn complete_step(
        &self,
        case_id: &str,
        step_id: &str,
        user_id: Option<&str>,
        context: &RequestContext,
    ) -> WorkflowResult<StepCompletion> {
        let (instance, completion) = {
            let _guard = self.locks.acquire(case_id).await?;

            let mut instance = self.load_instance(case_id)?;
            let current = self.open_step(&instance, step_id)?;
            if current.status.is_terminal() {
                return Err(WorkflowError::InvalidStepState {
                    step_id: step_id.to_string(),
                    status: current.status,
                    action: "completed",
                });
            }

            let now = Utc::now();
            let is_authorization = step_id == self.settings.authorization_step_id;
            let step = {
                let step = instance
                    .step_mut(step_id)
                    .ok_or_else(|| WorkflowError::StepNotFound(step_id.to_string()))?;
                step.status = StepStatus::Completed;
                step.completed_at = Some(now);
                step.started_at.get_or_insert(now);
                if is_authorization {
                    progress::stamp_signature(&mut step.data, context, now);
                }
                step.clone()
            };

            let next_step_id = progress::next_cursor(&instance, step.step_order);
            let workflow_completed = next_step_id.is_none();
            instance.current_step_id = next_step_id.clone();
            if workflow_completed {
                instance.status = WorkflowStatus::Completed;
                instance.completed_at = Some(now);
            }
            self.workflows.save(&instance, std::slice::from_ref(&step))?;

            let completion = StepCompletion {
                step_id: step_id.to_string(),
                status: step.status,
                next_step_id,
                workflow_completed,
            };
            (instance, completion)
        };

        info!(
            "Completed step {} of case {}, next: {}",
            step_id,
            case_id,
            completion.next_step_id.as_deref().unwrap_or("none")
        );
        if completion.workflow_completed {
            info!("All steps of case {} are done, workflow completed", case_id);
        }
        self.publish(
            &instance,
            user_id,
            WorkflowEvent::StepCompleted {
                step_id: step_id.to_string(),
            },
        )
        .await;
        Ok(completion)
    }

    /// Mark a step skipped. The cursor stays where it is.
    pub async fn skip_step(
        &self,
        case_id: &str,
        step_id: &str,
        user_id: Option<&str>,
    ) -> WorkflowResult<StepInstance> {
        let (instance, step) = {
            let _guard = self.locks.acquire(case_id).await?;

            let instance = self.load_instance(case_id)?;
            let current = self.open_step(&instance, step_id)?;
            if current.status.is_terminal() {
                return Err(WorkflowError::InvalidStepState {
                    step_id: step_id.to_string(),
                    status: current.status,
                    action: "skipped",
                });
            }

            let mut step = current.clone();
            step.status = StepStatus::Skipped;
            self.workflows.save(&instance, std::slice::from_ref(&step))?;
            (instance, step)
        };

        info!("Skipped step {} of case {}", step_id, case_id);
        self.publish(
            &instance,
            user_id,
            WorkflowEvent::StepSkipped {
                step_id: step_id.to_string(),
            },
        )
        .await;
        Ok(step)
    }

    pub fn get_step_data(&self, case_id: &str, step_id: &str) -> WorkflowResult<StepDataView> {
        let instance = self.load_instance(case_id)?;
        let step = instance
            .step(step_id)
            .ok_or_else(|| WorkflowError::StepNotFound(step_id.to_string()))?;
        Ok(StepDataView {
            step_id: step.step_id.clone(),
            status: step.status,
            data: step.data.clone().unwrap_or_default(),
        })
    }

    /// Look up a step that may still be written to: the workflow must not be
    /// completed and a signed authorization step is frozen.
    fn open_step<'a>(
        &self,
        instance: &'a WorkflowInstance,
        step_id: &str,
    ) -> WorkflowResult<&'a StepInstance> {
        let step = instance
            .step(step_id)
            .ok_or_else(|| WorkflowError::StepNotFound(step_id.to_string()))?;
        if instance.is_locked() {
            return Err(WorkflowError::Locked);
        }
        if step_id == self.settings.authorization_step_id && step.status == StepStatus::Completed
        {
            return Err(WorkflowError::SignedStepLocked(step_id.to_string()));
        }
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use anyhow::{bail, Result};

    use super::*;
    use crate::case::{Case, InMemoryAccessStore, InMemoryCaseStore};
    use crate::events::EventPublisher;
    use crate::payload::PayloadAssembler;
    use crate::workflow::definition::{DefinitionCatalog, WorkflowDefinition};
    use crate::workflow::error::ErrorKind;
    use crate::workflow::manager::WorkflowSettings;
    use crate::workflow::store::{InMemoryWorkflowStore, WorkflowStore};

    /// Store whose next save fails once when armed.
    #[derive(Default)]
    struct FailingStore {
        inner: InMemoryWorkflowStore,
        fail_next_save: AtomicBool,
    }

    impl WorkflowStore for FailingStore {
        fn create_instance(&self, instance: &WorkflowInstance) -> Result<()> {
            self.inner.create_instance(instance)
        }

        fn get_instance_by_case(&self, case_id: &str) -> Result<Option<WorkflowInstance>> {
            self.inner.get_instance_by_case(case_id)
        }

        fn save(&self, instance: &WorkflowInstance, steps: &[StepInstance]) -> Result<()> {
            if self.fail_next_save.swap(false, Ordering::SeqCst) {
                bail!("disk full");
            }
            self.inner.save(instance, steps)
        }
    }

    async fn manager_over(store: Arc<FailingStore>) -> WorkflowManager {
        let cases = Arc::new(InMemoryCaseStore::new());
        cases.insert(Case::new("case-1", "Acme")).unwrap();
        let catalog = DefinitionCatalog::new();
        catalog.register(WorkflowDefinition::group_setup()).unwrap();

        let manager = WorkflowManager::new(
            store,
            cases,
            Arc::new(InMemoryAccessStore::new()),
            Arc::new(catalog),
            Arc::new(EventPublisher::new()),
            PayloadAssembler::default(),
            WorkflowSettings::default(),
        );
        manager.start_online_setup("case-1", None).await.unwrap();
        manager
    }

    #[tokio::test]
    async fn failed_completion_leaves_step_and_cursor_unchanged() {
        let store = Arc::new(FailingStore::default());
        let manager = manager_over(store.clone()).await;

        store.fail_next_save.store(true, Ordering::SeqCst);
        let err = manager
            .complete_step("case-1", "licensing", None, &RequestContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        let stored = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(stored.step("licensing").unwrap().status, StepStatus::Pending);
        assert!(stored.step("licensing").unwrap().completed_at.is_none());
        assert_eq!(stored.current_step_id.as_deref(), Some("licensing"));
        assert_eq!(stored.status, WorkflowStatus::InProgress);

        let completion = manager
            .complete_step("case-1", "licensing", None, &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(completion.next_step_id.as_deref(), Some("company_info"));
        let stored = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(stored.step("licensing").unwrap().status, StepStatus::Completed);
        assert_eq!(stored.current_step_id.as_deref(), Some("company_info"));
    }

    #[tokio::test]
    async fn failed_save_leaves_step_pending() {
        let store = Arc::new(FailingStore::default());
        let manager = manager_over(store.clone()).await;

        store.fail_next_save.store(true, Ordering::SeqCst);
        let mut data = StepData::new();
        data.insert("note".to_string(), serde_json::json!("draft"));
        assert!(manager
            .save_step_data("case-1", "billing_setup", data, None)
            .await
            .is_err());

        let stored = store.get_instance_by_case("case-1").unwrap().unwrap();
        let step = stored.step("billing_setup").unwrap();
        assert_eq!(step.status, StepStatus::Pending);
        assert!(step.data.is_none());
        assert_eq!(stored.current_step_id.as_deref(), Some("licensing"));
    }
}
