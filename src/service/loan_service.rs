//! Loan service: request/offer stores facade, agreement formation, and the
//! loan lifecycle engine.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::domain::loan::LoanRole;
use crate::domain::{
    CondoId, EventBus, Loan, LoanEvent, LoanId, LoanOffer, LoanRequest, OfferId, RequestId, UserId,
};
use crate::error::MarketError;
use crate::persistence::{AgreementTerms, LoanStore, LoanTransition};

/// Maximum accepted length of a request title.
pub const TITLE_MAX_LEN: usize = 120;
/// Maximum accepted length of a request description.
pub const DESCRIPTION_MAX_LEN: usize = 2_000;
/// Maximum accepted length of the digital liability clause.
pub const DIGITAL_TERM_MAX_LEN: usize = 5_000;

/// Orchestration layer for the whole lending workflow.
///
/// Stateless coordinator: owns the [`LoanStore`] seam for state and the
/// [`EventBus`] for notification. Every mutation follows the pattern:
/// validate input → permission check → conditional/atomic store write →
/// emit event → return the updated entity. Nothing here retries or
/// recovers silently; conflicts surface to the caller as 409s.
#[derive(Debug, Clone)]
pub struct LoanService {
    store: Arc<dyn LoanStore>,
    event_bus: EventBus,
}

impl LoanService {
    /// Creates a new `LoanService`.
    #[must_use]
    pub fn new(store: Arc<dyn LoanStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // ── Request / Offer stores ──────────────────────────────────────────

    /// Creates a new loan request in the caller's condominium.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] if the title is empty or either
    /// text field exceeds its length bound.
    pub async fn create_request(
        &self,
        requester_id: UserId,
        condo_id: CondoId,
        title: &str,
        description: Option<String>,
    ) -> Result<LoanRequest, MarketError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(MarketError::Validation("title must not be empty".into()));
        }
        if title.len() > TITLE_MAX_LEN {
            return Err(MarketError::Validation(format!(
                "title must not exceed {TITLE_MAX_LEN} characters"
            )));
        }
        if description.as_ref().is_some_and(|d| d.len() > DESCRIPTION_MAX_LEN) {
            return Err(MarketError::Validation(format!(
                "description must not exceed {DESCRIPTION_MAX_LEN} characters"
            )));
        }

        let request = LoanRequest::new(requester_id, condo_id, title.to_string(), description);
        self.store.insert_request(&request).await?;

        tracing::info!(request_id = %request.id, %condo_id, "loan request created");
        Ok(request)
    }

    /// Lists open requests in the caller's condominium, excluding the
    /// caller's own asks, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] on store failure.
    pub async fn list_open_requests(
        &self,
        condo_id: CondoId,
        caller: UserId,
    ) -> Result<Vec<LoanRequest>, MarketError> {
        self.store.list_open_requests(condo_id, caller).await
    }

    /// Fetches a request with its offers, oldest offer first.
    ///
    /// Requests outside the caller's condominium are reported as not found
    /// rather than leaked.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::RequestNotFound`] if the request does not
    /// exist or belongs to another condominium.
    pub async fn get_request_with_offers(
        &self,
        request_id: RequestId,
        caller_condo: CondoId,
    ) -> Result<(LoanRequest, Vec<LoanOffer>), MarketError> {
        let request = self.visible_request(request_id, caller_condo).await?;
        let offers = self.store.offers_for_request(request_id).await?;
        Ok((request, offers))
    }

    /// Cancels an open request on behalf of its requester.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Permission`] if the caller is not the
    /// requester, and [`MarketError::RequestClosed`] if the request is no
    /// longer open.
    pub async fn cancel_request(
        &self,
        request_id: RequestId,
        acting_user_id: UserId,
        caller_condo: CondoId,
    ) -> Result<LoanRequest, MarketError> {
        let request = self.visible_request(request_id, caller_condo).await?;
        if request.requester_id != acting_user_id {
            return Err(MarketError::Permission(
                "only the requester may cancel a request".into(),
            ));
        }

        let cancelled = self
            .store
            .cancel_request(request_id)
            .await?
            .ok_or(MarketError::RequestClosed(request_id))?;

        tracing::info!(request_id = %request_id, "loan request cancelled");
        Ok(cancelled)
    }

    /// Creates an offer against an open request.
    ///
    /// The open check here is advisory: it rejects the common case early.
    /// The authoritative check happens inside the store, where the insert
    /// is conditional on the request still being open in the same atomic
    /// unit — an offer racing a concurrent formation can never land as
    /// `pending` on a fulfilled request.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::SelfOffer`] for offers on the caller's own
    /// request, [`MarketError::RequestNotFound`] for missing or
    /// foreign-condo requests, and [`MarketError::RequestClosed`] when the
    /// request no longer accepts offers.
    pub async fn create_offer(
        &self,
        request_id: RequestId,
        offerer_id: UserId,
        offerer_condo: CondoId,
    ) -> Result<LoanOffer, MarketError> {
        let request = self.visible_request(request_id, offerer_condo).await?;
        if request.requester_id == offerer_id {
            return Err(MarketError::SelfOffer);
        }
        if !request.is_open() {
            return Err(MarketError::RequestClosed(request_id));
        }

        let offer = LoanOffer::new(request_id, offerer_id);
        self.store.insert_offer(&offer).await?;

        let _ = self.event_bus.publish(LoanEvent::OfferCreated {
            request_id,
            offer_id: offer.id,
            offerer_id,
            requester_id: request.requester_id,
            timestamp: Utc::now(),
        });

        tracing::info!(offer_id = %offer.id, request_id = %request_id, "offer created");
        Ok(offer)
    }

    // ── Agreement Formation Engine ──────────────────────────────────────

    /// Converts exactly one pending offer into a binding [`Loan`].
    ///
    /// Input validation happens here; the permission and pending-status
    /// preconditions are re-checked by the store inside the same atomic
    /// unit of work that accepts the offer, rejects its siblings, and
    /// fulfills the request. Of N concurrent calls against offers on one
    /// request, exactly one commits; the rest observe
    /// [`MarketError::OfferUnavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] for an unparseable or past
    /// return date, an empty or oversized term, or a malformed photo URL;
    /// otherwise the formation errors documented on
    /// [`LoanStore::form_agreement`].
    pub async fn form_agreement(
        &self,
        offer_id: OfferId,
        acting_user_id: UserId,
        agreed_return_date: &str,
        digital_term: &str,
        handover_photo_url: &str,
    ) -> Result<Loan, MarketError> {
        let agreed_return_date = parse_return_date(agreed_return_date)?;
        if agreed_return_date < Utc::now().date_naive() {
            return Err(MarketError::Validation(
                "agreed return date must not be in the past".into(),
            ));
        }
        if digital_term.trim().is_empty() {
            return Err(MarketError::Validation(
                "digital term must not be empty".into(),
            ));
        }
        if digital_term.len() > DIGITAL_TERM_MAX_LEN {
            return Err(MarketError::Validation(format!(
                "digital term must not exceed {DIGITAL_TERM_MAX_LEN} characters"
            )));
        }
        validate_photo_url(handover_photo_url)?;

        let terms = AgreementTerms {
            agreed_return_date,
            digital_term: digital_term.trim().to_string(),
            handover_photo_url: handover_photo_url.to_string(),
        };
        let loan = self
            .store
            .form_agreement(offer_id, acting_user_id, terms)
            .await?;

        let _ = self.event_bus.publish(LoanEvent::LoanFormed {
            loan_id: loan.id,
            request_id: loan.loan_request_id,
            owner_id: loan.owner_id,
            borrower_id: loan.borrower_id,
            timestamp: Utc::now(),
        });

        tracing::info!(
            loan_id = %loan.id,
            owner_id = %loan.owner_id,
            borrower_id = %loan.borrower_id,
            "loan agreement formed"
        );
        Ok(loan)
    }

    // ── Loan Lifecycle Engine ───────────────────────────────────────────

    /// Fetches a loan, enforcing the two-party read rule.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Permission`] if the caller is neither the
    /// owner nor the borrower.
    pub async fn get_loan_for(
        &self,
        loan_id: LoanId,
        caller: UserId,
    ) -> Result<Loan, MarketError> {
        let loan = self.loan_or_not_found(loan_id).await?;
        if !loan.is_party(caller) {
            return Err(MarketError::Permission(
                "only the owner or borrower may view this loan".into(),
            ));
        }
        Ok(loan)
    }

    /// Returns the caller's loans, split into lent and borrowed.
    ///
    /// # Errors
    ///
    /// Returns a [`MarketError::Persistence`] on store failure.
    pub async fn my_loans(&self, caller: UserId) -> Result<(Vec<Loan>, Vec<Loan>), MarketError> {
        self.store.loans_for_user(caller).await
    }

    /// Owner confirms the physical handover: `pending_handover` → `active`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Permission`] unless the caller is the owner,
    /// and [`MarketError::InvalidStateTransition`] if the loan already
    /// moved past handover (a double-submit fails cleanly).
    pub async fn confirm_handover(
        &self,
        loan_id: LoanId,
        acting_user_id: UserId,
    ) -> Result<Loan, MarketError> {
        let loan = self.loan_or_not_found(loan_id).await?;
        self.require_role(&loan, acting_user_id, LoanRole::Owner, "confirm the handover")?;

        let updated = self
            .apply_or_conflict(&loan, &LoanTransition::ConfirmHandover)
            .await?;

        tracing::info!(loan_id = %loan_id, "handover confirmed");
        Ok(updated)
    }

    /// Borrower reports the item returned: `active` →
    /// `pending_return_confirmation`.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Validation`] for an empty condition or a
    /// malformed photo URL, [`MarketError::Permission`] unless the caller
    /// is the borrower, and [`MarketError::InvalidStateTransition`] when
    /// the loan is not active.
    pub async fn initiate_return(
        &self,
        loan_id: LoanId,
        acting_user_id: UserId,
        condition: &str,
        notes: Option<&str>,
        return_photo_url: Option<&str>,
    ) -> Result<Loan, MarketError> {
        let condition = condition.trim();
        if condition.is_empty() {
            return Err(MarketError::Validation(
                "return condition must not be empty".into(),
            ));
        }
        if let Some(url) = return_photo_url {
            validate_photo_url(url)?;
        }

        let loan = self.loan_or_not_found(loan_id).await?;
        self.require_role(&loan, acting_user_id, LoanRole::Borrower, "initiate the return")?;

        let condition_notes = match notes.map(str::trim).filter(|n| !n.is_empty()) {
            Some(notes) => format!("{condition}; {notes}"),
            None => condition.to_string(),
        };
        let transition = LoanTransition::InitiateReturn {
            condition_notes,
            return_photo_url: return_photo_url.map(ToString::to_string),
        };
        let updated = self.apply_or_conflict(&loan, &transition).await?;

        tracing::info!(loan_id = %loan_id, "return initiated");
        Ok(updated)
    }

    /// Owner confirms the return: `pending_return_confirmation` →
    /// `returned`. Emits the closure event.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Permission`] unless the caller is the owner,
    /// and [`MarketError::InvalidStateTransition`] if the loan is not
    /// awaiting return confirmation.
    pub async fn confirm_return(
        &self,
        loan_id: LoanId,
        acting_user_id: UserId,
    ) -> Result<Loan, MarketError> {
        let loan = self.loan_or_not_found(loan_id).await?;
        self.require_role(&loan, acting_user_id, LoanRole::Owner, "confirm the return")?;

        let updated = self
            .apply_or_conflict(&loan, &LoanTransition::ConfirmReturn)
            .await?;

        let _ = self.event_bus.publish(LoanEvent::LoanReturned {
            loan_id: updated.id,
            owner_id: updated.owner_id,
            borrower_id: updated.borrower_id,
            timestamp: Utc::now(),
        });

        tracing::info!(loan_id = %loan_id, "loan returned");
        Ok(updated)
    }

    /// Either party contests the loan from any non-terminal state. Emits
    /// the closure event.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::Permission`] if the caller is neither party,
    /// and [`MarketError::InvalidStateTransition`] once the loan is
    /// terminal.
    pub async fn raise_dispute(
        &self,
        loan_id: LoanId,
        acting_user_id: UserId,
    ) -> Result<Loan, MarketError> {
        let loan = self.loan_or_not_found(loan_id).await?;
        if !loan.is_party(acting_user_id) {
            return Err(MarketError::Permission(
                "only the owner or borrower may raise a dispute".into(),
            ));
        }

        let updated = self
            .apply_or_conflict(&loan, &LoanTransition::RaiseDispute)
            .await?;

        let _ = self.event_bus.publish(LoanEvent::LoanDisputed {
            loan_id: updated.id,
            owner_id: updated.owner_id,
            borrower_id: updated.borrower_id,
            raised_by: acting_user_id,
            timestamp: Utc::now(),
        });

        tracing::warn!(loan_id = %loan_id, raised_by = %acting_user_id, "loan disputed");
        Ok(updated)
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    async fn visible_request(
        &self,
        request_id: RequestId,
        caller_condo: CondoId,
    ) -> Result<LoanRequest, MarketError> {
        match self.store.get_request(request_id).await? {
            Some(request) if request.condo_id == caller_condo => Ok(request),
            _ => Err(MarketError::RequestNotFound(request_id)),
        }
    }

    async fn loan_or_not_found(&self, loan_id: LoanId) -> Result<Loan, MarketError> {
        self.store
            .get_loan(loan_id)
            .await?
            .ok_or(MarketError::LoanNotFound(loan_id))
    }

    fn require_role(
        &self,
        loan: &Loan,
        acting_user_id: UserId,
        required: LoanRole,
        action: &str,
    ) -> Result<(), MarketError> {
        if loan.role_of(acting_user_id) == Some(required) {
            Ok(())
        } else {
            let who = match required {
                LoanRole::Owner => "owner",
                LoanRole::Borrower => "borrower",
            };
            Err(MarketError::Permission(format!(
                "only the {who} may {action}"
            )))
        }
    }

    async fn apply_or_conflict(
        &self,
        loan: &Loan,
        transition: &LoanTransition,
    ) -> Result<Loan, MarketError> {
        self.store
            .apply_transition(loan.id, transition)
            .await?
            .ok_or(MarketError::InvalidStateTransition {
                loan_id: loan.id,
                status: loan.status,
            })
    }
}

/// Parses a return date from either a plain date (`YYYY-MM-DD`) or an
/// RFC 3339 timestamp.
fn parse_return_date(raw: &str) -> Result<NaiveDate, MarketError> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .map_err(|_| MarketError::Validation(format!("invalid agreed return date: {raw}")))
}

/// Requires an absolute http(s) URL with a host.
fn validate_photo_url(raw: &str) -> Result<(), MarketError> {
    let uri: axum::http::Uri = raw
        .parse()
        .map_err(|_| MarketError::Validation(format!("invalid photo URL: {raw}")))?;
    let scheme_ok = matches!(uri.scheme_str(), Some("http" | "https"));
    if !scheme_ok || uri.authority().is_none() {
        return Err(MarketError::Validation(format!("invalid photo URL: {raw}")));
    }
    Ok(())
}
