//! Servicing payload assembly.

mod assembler;
mod models;

pub use assembler::{PayloadAssembler, FINAL_SIGNATURE_FIELD};
pub use models::{
    AuthorizationSummary, BillingSummary, InitialPremium, SectionsCompleted, ServicingPayload,
};
