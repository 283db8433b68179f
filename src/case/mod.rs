//! Cases, roles and contacts.
//!
//! The workflow engine reads and updates cases through [`CaseStore`] and
//! resolves who to hand work over to through [`AccessStore`].

mod models;
mod store;

pub use models::{Case, CaseAccess, CaseStatus, Contact, Role, UserContact};
pub use store::{AccessStore, CaseStore, InMemoryAccessStore, InMemoryCaseStore};
