//! Persistence layer: the storage seam for the lending workflow.
//!
//! [`LoanStore`] is the explicit storage interface consumed by the service
//! layer. The single production implementation is
//! [`postgres::PostgresStore`], backed by `sqlx::PgPool`; an in-memory
//! implementation exists only for engine tests. Multi-row atomicity
//! (agreement formation) and conditional single-row updates (lifecycle
//! transitions) are guaranteed by the implementations, never by callers.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;

use crate::domain::{
    CondoId, Loan, LoanId, LoanOffer, LoanRequest, LoanStatus, OfferId, RequestId, UserId,
};
use crate::error::MarketError;
use chrono::NaiveDate;

/// Validated agreement parameters passed to [`LoanStore::form_agreement`].
#[derive(Debug, Clone)]
pub struct AgreementTerms {
    /// Return date both parties agreed on (already validated as not past).
    pub agreed_return_date: NaiveDate,
    /// Free-text liability clause.
    pub digital_term: String,
    /// Photo of the item taken at agreement time (already validated as a
    /// well-formed URL).
    pub handover_photo_url: String,
}

/// A conditional lifecycle transition on a single [`Loan`] row.
///
/// Each variant pins the set of statuses it may fire from; implementations
/// apply it as `UPDATE ... WHERE id = ? AND status IN (...)` so a stale
/// caller affects zero rows instead of corrupting state.
#[derive(Debug, Clone)]
pub enum LoanTransition {
    /// Owner confirms the physical handover; sets `handover_date`.
    ConfirmHandover,
    /// Borrower reports the item returned with condition notes.
    InitiateReturn {
        /// Condition description recorded by the borrower.
        condition_notes: String,
        /// Optional photo of the returned item.
        return_photo_url: Option<String>,
    },
    /// Owner confirms the return; sets `actual_return_date`.
    ConfirmReturn,
    /// Either party contests the loan.
    RaiseDispute,
}

impl LoanTransition {
    /// Statuses this transition may fire from.
    #[must_use]
    pub const fn from_statuses(&self) -> &'static [LoanStatus] {
        match self {
            Self::ConfirmHandover => &[LoanStatus::PendingHandover],
            Self::InitiateReturn { .. } => &[LoanStatus::Active],
            Self::ConfirmReturn => &[LoanStatus::PendingReturnConfirmation],
            Self::RaiseDispute => &[
                LoanStatus::PendingHandover,
                LoanStatus::Active,
                LoanStatus::PendingReturnConfirmation,
            ],
        }
    }

    /// Status the loan lands in when the transition commits.
    #[must_use]
    pub const fn to_status(&self) -> LoanStatus {
        match self {
            Self::ConfirmHandover => LoanStatus::Active,
            Self::InitiateReturn { .. } => LoanStatus::PendingReturnConfirmation,
            Self::ConfirmReturn => LoanStatus::Returned,
            Self::RaiseDispute => LoanStatus::Disputed,
        }
    }
}

/// Storage interface for requests, offers, and loans.
///
/// All methods are scoped to single logical operations; the only multi-row
/// unit of work is [`LoanStore::form_agreement`], which implementations
/// must execute atomically with the precondition re-check inside the same
/// unit (see the agreement formation engine for why).
#[async_trait]
pub trait LoanStore: Send + Sync + std::fmt::Debug {
    /// Inserts a freshly created request.
    async fn insert_request(&self, request: &LoanRequest) -> Result<(), MarketError>;

    /// Lists `open` requests in a condominium, newest first, excluding
    /// those authored by `excluding`.
    async fn list_open_requests(
        &self,
        condo_id: CondoId,
        excluding: UserId,
    ) -> Result<Vec<LoanRequest>, MarketError>;

    /// Fetches a request by id.
    async fn get_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError>;

    /// Cancels a request if it is still `open`.
    ///
    /// Returns the updated request, or `None` if the conditional update
    /// matched zero rows (already fulfilled or cancelled).
    async fn cancel_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError>;

    /// Inserts a freshly created offer, conditional on the parent request
    /// still being `open`.
    ///
    /// The open-check and the insert are one atomic unit, serialized
    /// against [`LoanStore::form_agreement`]: an offer can never land as
    /// `pending` on a request a concurrent formation already fulfilled.
    ///
    /// # Errors
    ///
    /// [`MarketError::RequestNotFound`] if the request does not exist, and
    /// [`MarketError::RequestClosed`] if it stopped accepting offers by
    /// the time the insert lands.
    async fn insert_offer(&self, offer: &LoanOffer) -> Result<(), MarketError>;

    /// Lists all offers on a request, oldest first.
    async fn offers_for_request(&self, id: RequestId) -> Result<Vec<LoanOffer>, MarketError>;

    /// Atomically converts one pending offer into a [`Loan`].
    ///
    /// Inside a single all-or-nothing unit of work: re-reads the offer and
    /// its parent request under a write lock, verifies `acting_user_id` is
    /// the original requester and the offer is still `pending` on an `open`
    /// request, accepts the offer, rejects every sibling `pending` offer,
    /// marks the request `fulfilled`, and inserts the loan at
    /// `pending_handover`.
    ///
    /// # Errors
    ///
    /// [`MarketError::OfferNotFound`] if the offer does not exist,
    /// [`MarketError::Permission`] if the caller is not the requester, and
    /// [`MarketError::OfferUnavailable`] if a prior formation already
    /// settled the offer or the request is no longer open.
    async fn form_agreement(
        &self,
        offer_id: OfferId,
        acting_user_id: UserId,
        terms: AgreementTerms,
    ) -> Result<Loan, MarketError>;

    /// Fetches a loan by id.
    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>, MarketError>;

    /// Returns the loans where the user is the owner (lent) and those where
    /// the user is the borrower (borrowed), newest first.
    async fn loans_for_user(&self, user_id: UserId)
    -> Result<(Vec<Loan>, Vec<Loan>), MarketError>;

    /// Applies a lifecycle transition as a conditional update.
    ///
    /// Returns the updated loan, or `None` if the loan's current status was
    /// not in [`LoanTransition::from_statuses`] (zero rows affected). A
    /// `None` here is how double-submits and racing parties lose cleanly.
    async fn apply_transition(
        &self,
        id: LoanId,
        transition: &LoanTransition,
    ) -> Result<Option<Loan>, MarketError>;
}
