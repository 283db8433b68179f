//! Workflow instance storage.
//!
//! The engine only depends on the [`WorkflowStore`] trait. The in-memory
//! implementation backs tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};

use super::models::{StepInstance, WorkflowInstance};

/// Trait for workflow instance storage operations.
pub trait WorkflowStore: Send + Sync {
    /// Create an instance together with all of its step instances as a single
    /// unit. Fails if the case already has an instance.
    fn create_instance(&self, instance: &WorkflowInstance) -> Result<()>;

    /// Get the instance of a case, with all step instances loaded.
    fn get_instance_by_case(&self, case_id: &str) -> Result<Option<WorkflowInstance>>;

    /// Write the instance-level fields and the given step instances as a
    /// single unit. Steps not listed are left untouched. Nothing is written
    /// unless the instance and every listed step exist.
    fn save(&self, instance: &WorkflowInstance, steps: &[StepInstance]) -> Result<()>;
}

/// In-memory workflow store keyed by case id.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    instances: Mutex<HashMap<String, WorkflowInstance>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, WorkflowInstance>>> {
        self.instances
            .lock()
            .map_err(|_| anyhow::anyhow!("Workflow store lock poisoned"))
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    fn create_instance(&self, instance: &WorkflowInstance) -> Result<()> {
        let mut instances = self.lock()?;
        if instances.contains_key(&instance.case_id) {
            bail!("Case {} already has a workflow instance", instance.case_id);
        }
        instances.insert(instance.case_id.clone(), instance.clone());
        Ok(())
    }

    fn get_instance_by_case(&self, case_id: &str) -> Result<Option<WorkflowInstance>> {
        Ok(self.lock()?.get(case_id).cloned())
    }

    fn save(&self, instance: &WorkflowInstance, steps: &[StepInstance]) -> Result<()> {
        let mut instances = self.lock()?;
        let stored = instances
            .get_mut(&instance.case_id)
            .filter(|stored| stored.id == instance.id)
            .with_context(|| format!("Workflow instance {} not found", instance.id))?;

        let mut positions = Vec::with_capacity(steps.len());
        for step in steps {
            let position = stored
                .steps
                .iter()
                .position(|s| s.id == step.id && step.workflow_instance_id == stored.id)
                .with_context(|| format!("Step instance {} not found", step.id))?;
            positions.push(position);
        }

        stored.status = instance.status;
        stored.current_step_id = instance.current_step_id.clone();
        stored.is_offline = instance.is_offline;
        stored.started_at = instance.started_at;
        stored.completed_at = instance.completed_at;
        for (position, step) in positions.into_iter().zip(steps) {
            stored.steps[position] = step.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::models::{StepStatus, WorkflowStatus};

    fn instance_with_steps(case_id: &str) -> WorkflowInstance {
        let mut instance = WorkflowInstance::new(case_id, "wf", 1);
        instance.steps = vec![
            StepInstance::new(&instance.id, "a", 1, None),
            StepInstance::new(&instance.id, "b", 2, None),
        ];
        instance
    }

    #[test]
    fn create_and_fetch_with_steps() {
        let store = InMemoryWorkflowStore::new();
        let instance = instance_with_steps("case-1");
        store.create_instance(&instance).unwrap();

        let fetched = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(fetched, instance);
        assert!(store.get_instance_by_case("case-2").unwrap().is_none());
    }

    #[test]
    fn second_instance_for_case_is_rejected() {
        let store = InMemoryWorkflowStore::new();
        store.create_instance(&instance_with_steps("case-1")).unwrap();
        assert!(store.create_instance(&instance_with_steps("case-1")).is_err());
        assert_eq!(
            store
                .get_instance_by_case("case-1")
                .unwrap()
                .unwrap()
                .steps
                .len(),
            2
        );
    }

    #[test]
    fn save_without_steps_leaves_steps_alone() {
        let store = InMemoryWorkflowStore::new();
        let mut instance = instance_with_steps("case-1");
        store.create_instance(&instance).unwrap();

        instance.status = WorkflowStatus::InProgress;
        instance.current_step_id = Some("b".to_string());
        instance.steps.clear();
        store.save(&instance, &[]).unwrap();

        let fetched = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(fetched.status, WorkflowStatus::InProgress);
        assert_eq!(fetched.current_step_id.as_deref(), Some("b"));
        assert_eq!(fetched.steps.len(), 2);
    }

    #[test]
    fn save_writes_step_and_cursor_together() {
        let store = InMemoryWorkflowStore::new();
        let mut instance = instance_with_steps("case-1");
        store.create_instance(&instance).unwrap();

        let mut step = instance.steps[1].clone();
        step.status = StepStatus::Skipped;
        instance.current_step_id = Some("a".to_string());
        store.save(&instance, &[step]).unwrap();

        let fetched = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(fetched.step("b").unwrap().status, StepStatus::Skipped);
        assert_eq!(fetched.step("a").unwrap().status, StepStatus::Pending);
        assert_eq!(fetched.current_step_id.as_deref(), Some("a"));
    }

    #[test]
    fn save_with_unknown_step_writes_nothing() {
        let store = InMemoryWorkflowStore::new();
        let mut instance = instance_with_steps("case-1");
        store.create_instance(&instance).unwrap();

        let mut known = instance.steps[0].clone();
        known.status = StepStatus::Completed;
        let stray = StepInstance::new("other-instance", "a", 1, None);
        instance.status = WorkflowStatus::Completed;
        assert!(store.save(&instance, &[known, stray]).is_err());

        let fetched = store.get_instance_by_case("case-1").unwrap().unwrap();
        assert_eq!(fetched.status, WorkflowStatus::NotStarted);
        assert_eq!(fetched.step("a").unwrap().status, StepStatus::Pending);
    }

    #[test]
    fn save_unknown_instance_fails() {
        let store = InMemoryWorkflowStore::new();
        store.create_instance(&instance_with_steps("case-1")).unwrap();
        let other = instance_with_steps("case-1");
        assert!(store.save(&other, &[]).is_err());
    }
}
