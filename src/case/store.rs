//! Case and access lookups used by the workflow engine.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{Context, Result};

use super::models::{Case, CaseAccess, CaseStatus, Role, UserContact};

/// Trait for case storage operations.
pub trait CaseStore: Send + Sync {
    /// Get a case by ID.
    fn get_case(&self, case_id: &str) -> Result<Option<Case>>;

    /// Set the outward status of a case.
    fn update_status(&self, case_id: &str, status: CaseStatus) -> Result<()>;
}

/// Trait for access grant and user lookups.
pub trait AccessStore: Send + Sync {
    /// List access grants on a case held in the given role.
    fn list_access_by_role(&self, case_id: &str, role: Role) -> Result<Vec<CaseAccess>>;

    /// Find any registered user with the given role.
    fn find_user_by_role(&self, role: Role) -> Result<Option<UserContact>>;
}

/// In-memory case store.
#[derive(Default)]
pub struct InMemoryCaseStore {
    cases: RwLock<HashMap<String, Case>>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, case: Case) -> Result<()> {
        self.cases
            .write()
            .map_err(|_| anyhow::anyhow!("Case store lock poisoned"))?
            .insert(case.id.clone(), case);
        Ok(())
    }
}

impl CaseStore for InMemoryCaseStore {
    fn get_case(&self, case_id: &str) -> Result<Option<Case>> {
        Ok(self
            .cases
            .read()
            .map_err(|_| anyhow::anyhow!("Case store lock poisoned"))?
            .get(case_id)
            .cloned())
    }

    fn update_status(&self, case_id: &str, status: CaseStatus) -> Result<()> {
        let mut cases = self
            .cases
            .write()
            .map_err(|_| anyhow::anyhow!("Case store lock poisoned"))?;
        let case = cases
            .get_mut(case_id)
            .with_context(|| format!("Case {} not found", case_id))?;
        case.status = status;
        Ok(())
    }
}

/// In-memory access store holding grants and registered users.
#[derive(Default)]
pub struct InMemoryAccessStore {
    grants: RwLock<Vec<CaseAccess>>,
    users: RwLock<Vec<UserContact>>,
}

impl InMemoryAccessStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, access: CaseAccess) -> Result<()> {
        self.grants
            .write()
            .map_err(|_| anyhow::anyhow!("Access store lock poisoned"))?
            .push(access);
        Ok(())
    }

    pub fn add_user(&self, user: UserContact) -> Result<()> {
        self.users
            .write()
            .map_err(|_| anyhow::anyhow!("Access store lock poisoned"))?
            .push(user);
        Ok(())
    }
}

impl AccessStore for InMemoryAccessStore {
    fn list_access_by_role(&self, case_id: &str, role: Role) -> Result<Vec<CaseAccess>> {
        Ok(self
            .grants
            .read()
            .map_err(|_| anyhow::anyhow!("Access store lock poisoned"))?
            .iter()
            .filter(|a| a.case_id == case_id && a.role == role)
            .cloned()
            .collect())
    }

    fn find_user_by_role(&self, role: Role) -> Result<Option<UserContact>> {
        Ok(self
            .users
            .read()
            .map_err(|_| anyhow::anyhow!("Access store lock poisoned"))?
            .iter()
            .find(|u| u.role == role)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_status_of_missing_case_fails() {
        let store = InMemoryCaseStore::new();
        assert!(store
            .update_status("nope", CaseStatus::Submitted)
            .is_err());
    }

    #[test]
    fn update_status_persists() {
        let store = InMemoryCaseStore::new();
        store.insert(Case::new("c1", "Acme")).unwrap();
        store
            .update_status("c1", CaseStatus::ApplicationInProgress)
            .unwrap();
        assert_eq!(
            store.get_case("c1").unwrap().unwrap().status,
            CaseStatus::ApplicationInProgress
        );
    }

    #[test]
    fn access_is_filtered_by_case_and_role() {
        let store = InMemoryAccessStore::new();
        let grant = |case_id: &str, role: Role, email: &str| CaseAccess {
            case_id: case_id.to_string(),
            role,
            first_name: "F".to_string(),
            last_name: "L".to_string(),
            email: email.to_string(),
        };
        store.grant(grant("c1", Role::Broker, "b@x")).unwrap();
        store.grant(grant("c1", Role::Employer, "e1@x")).unwrap();
        store.grant(grant("c2", Role::Employer, "e2@x")).unwrap();

        let employers = store.list_access_by_role("c1", Role::Employer).unwrap();
        assert_eq!(employers.len(), 1);
        assert_eq!(employers[0].email, "e1@x");
        assert!(store.find_user_by_role(Role::Employer).unwrap().is_none());
    }
}
