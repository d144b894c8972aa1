//! Service layer: business logic orchestration.
//!
//! [`LoanService`] validates input, enforces the permission and state
//! rules of the lending workflow, delegates persistence to the
//! [`crate::persistence::LoanStore`] seam, and emits events through the
//! [`crate::domain::EventBus`].

pub mod loan_service;

pub use loan_service::LoanService;
