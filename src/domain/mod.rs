//! Domain layer: identifiers, lending entities, status machines, and the
//! event system.
//!
//! The three entities mirror the persisted tables: a [`LoanRequest`] is a
//! resident's public ask, [`LoanOffer`]s are neighbors' pledges against it,
//! and a [`Loan`] is the binding agreement formed from exactly one accepted
//! offer. Status enums encode the forward-only state machines; the
//! [`EventBus`] broadcasts [`LoanEvent`]s to downstream consumers such as
//! the chat/notification bridge.

pub mod event_bus;
pub mod ids;
pub mod loan;
pub mod loan_event;
pub mod loan_offer;
pub mod loan_request;

pub use event_bus::EventBus;
pub use ids::{CondoId, LoanId, OfferId, RequestId, UserId};
pub use loan::{Loan, LoanStatus};
pub use loan_event::LoanEvent;
pub use loan_offer::{LoanOffer, OfferStatus};
pub use loan_request::{LoanRequest, RequestStatus};
