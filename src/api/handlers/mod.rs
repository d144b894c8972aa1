//! REST endpoint handlers organized by resource.

pub mod loan;
pub mod request;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all authenticated resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(request::routes())
        .merge(loan::routes())
}
