//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::service::LoanService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// The event bus is reachable through the service
/// ([`LoanService::event_bus`]); subscribers hang off the service, not
/// the router state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Loan service for all business logic.
    pub loan_service: Arc<LoanService>,
    /// Bearer token verifier backing the `Principal` extractor.
    pub verifier: TokenVerifier,
}
