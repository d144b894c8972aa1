//! Data Transfer Objects for REST request/response serialization.
//!
//! Wire JSON is camelCase; the domain stays snake_case. Response DTOs are
//! built from domain entities via `From` impls so handlers never serialize
//! storage types directly.

pub mod loan_dto;
pub mod offer_dto;
pub mod request_dto;

pub use loan_dto::*;
pub use offer_dto::*;
pub use request_dto::*;
