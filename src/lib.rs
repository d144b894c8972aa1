//! # condo-loans
//!
//! REST service for the peer-to-peer item lending workflow inside a
//! condominium: residents post loan requests, neighbors make competing
//! offers, the requester accepts exactly one, and the resulting loan moves
//! through a confirmed lifecycle until the item is returned or disputed.
//!
//! Identity (who lives where) is established elsewhere; this service
//! trusts the bearer token it is handed and scopes every read and write to
//! the caller's condominium.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── Principal extractor (auth/)
//!     │
//!     ├── LoanService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── LoanStore (persistence/)
//!     └── PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
