//! In-memory [`LoanStore`] used by engine tests.
//!
//! Holds the three tables behind one async mutex, so every operation —
//! including the multi-row agreement formation — commits atomically with
//! the precondition check, giving the same linearization guarantee the
//! production store gets from its transaction and row locks.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{AgreementTerms, LoanStore, LoanTransition};
use crate::domain::{
    CondoId, Loan, LoanId, LoanOffer, LoanRequest, LoanStatus, OfferId, OfferStatus, RequestId,
    RequestStatus, UserId,
};
use crate::error::MarketError;

#[derive(Debug, Default)]
struct Tables {
    requests: HashMap<RequestId, LoanRequest>,
    offers: HashMap<OfferId, LoanOffer>,
    loans: HashMap<LoanId, Loan>,
}

/// Mutex-serialized in-memory store for tests.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanStore for InMemoryStore {
    async fn insert_request(&self, request: &LoanRequest) -> Result<(), MarketError> {
        let mut tables = self.tables.lock().await;
        tables.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn list_open_requests(
        &self,
        condo_id: CondoId,
        excluding: UserId,
    ) -> Result<Vec<LoanRequest>, MarketError> {
        let tables = self.tables.lock().await;
        let mut open: Vec<LoanRequest> = tables
            .requests
            .values()
            .filter(|r| {
                r.condo_id == condo_id
                    && r.status == RequestStatus::Open
                    && r.requester_id != excluding
            })
            .cloned()
            .collect();
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(open)
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError> {
        let tables = self.tables.lock().await;
        Ok(tables.requests.get(&id).cloned())
    }

    async fn cancel_request(&self, id: RequestId) -> Result<Option<LoanRequest>, MarketError> {
        let mut tables = self.tables.lock().await;
        match tables.requests.get_mut(&id) {
            Some(request) if request.status == RequestStatus::Open => {
                request.status = RequestStatus::Cancelled;
                Ok(Some(request.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn insert_offer(&self, offer: &LoanOffer) -> Result<(), MarketError> {
        // Open-check and insert under the same lock, mirroring the
        // production share-lock on the parent request.
        let mut tables = self.tables.lock().await;
        match tables.requests.get(&offer.loan_request_id) {
            None => return Err(MarketError::RequestNotFound(offer.loan_request_id)),
            Some(request) if request.status != RequestStatus::Open => {
                return Err(MarketError::RequestClosed(offer.loan_request_id));
            }
            Some(_) => {}
        }
        tables.offers.insert(offer.id, offer.clone());
        Ok(())
    }

    async fn offers_for_request(&self, id: RequestId) -> Result<Vec<LoanOffer>, MarketError> {
        let tables = self.tables.lock().await;
        let mut offers: Vec<LoanOffer> = tables
            .offers
            .values()
            .filter(|o| o.loan_request_id == id)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(offers)
    }

    async fn form_agreement(
        &self,
        offer_id: OfferId,
        acting_user_id: UserId,
        terms: AgreementTerms,
    ) -> Result<Loan, MarketError> {
        // One lock for check + multi-row write: the whole formation is a
        // single critical section, like the production transaction.
        let mut tables = self.tables.lock().await;

        let Some(offer) = tables.offers.get(&offer_id).cloned() else {
            return Err(MarketError::OfferNotFound(offer_id));
        };
        let Some(request) = tables.requests.get(&offer.loan_request_id).cloned() else {
            return Err(MarketError::RequestNotFound(offer.loan_request_id));
        };

        if request.requester_id != acting_user_id {
            return Err(MarketError::Permission(
                "only the original requester may accept an offer".into(),
            ));
        }
        if offer.status != OfferStatus::Pending || request.status != RequestStatus::Open {
            return Err(MarketError::OfferUnavailable(offer_id));
        }

        let request_id = request.id;
        for sibling in tables
            .offers
            .values_mut()
            .filter(|o| o.loan_request_id == request_id && o.status == OfferStatus::Pending)
        {
            sibling.status = if sibling.id == offer_id {
                OfferStatus::Accepted
            } else {
                OfferStatus::Rejected
            };
        }
        if let Some(req) = tables.requests.get_mut(&request_id) {
            req.status = RequestStatus::Fulfilled;
        }

        let now = Utc::now();
        let loan = Loan {
            id: LoanId::new(),
            loan_request_id: request_id,
            offer_id,
            owner_id: offer.offerer_id,
            borrower_id: request.requester_id,
            agreed_return_date: terms.agreed_return_date,
            digital_term: terms.digital_term,
            handover_photo_url: terms.handover_photo_url,
            status: LoanStatus::PendingHandover,
            handover_date: None,
            actual_return_date: None,
            return_condition_notes: None,
            return_photo_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    async fn get_loan(&self, id: LoanId) -> Result<Option<Loan>, MarketError> {
        let tables = self.tables.lock().await;
        Ok(tables.loans.get(&id).cloned())
    }

    async fn loans_for_user(
        &self,
        user_id: UserId,
    ) -> Result<(Vec<Loan>, Vec<Loan>), MarketError> {
        let tables = self.tables.lock().await;
        let mut lent: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| l.owner_id == user_id)
            .cloned()
            .collect();
        let mut borrowed: Vec<Loan> = tables
            .loans
            .values()
            .filter(|l| l.borrower_id == user_id)
            .cloned()
            .collect();
        lent.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        borrowed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok((lent, borrowed))
    }

    async fn apply_transition(
        &self,
        id: LoanId,
        transition: &LoanTransition,
    ) -> Result<Option<Loan>, MarketError> {
        let mut tables = self.tables.lock().await;
        let Some(loan) = tables.loans.get_mut(&id) else {
            return Ok(None);
        };
        if !transition.from_statuses().contains(&loan.status) {
            return Ok(None);
        }

        let now = Utc::now();
        loan.status = transition.to_status();
        loan.updated_at = now;
        match transition {
            LoanTransition::ConfirmHandover => loan.handover_date = Some(now),
            LoanTransition::InitiateReturn {
                condition_notes,
                return_photo_url,
            } => {
                loan.return_condition_notes = Some(condition_notes.clone());
                loan.return_photo_url = return_photo_url.clone();
            }
            LoanTransition::ConfirmReturn => loan.actual_return_date = Some(now),
            LoanTransition::RaiseDispute => {}
        }
        Ok(Some(loan.clone()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_offer_on_closed_request_is_rejected() {
        let store = InMemoryStore::new();
        let request = LoanRequest::new(
            UserId::new(),
            CondoId::new(),
            "Need a ladder".to_string(),
            None,
        );
        let request_id = request.id;
        assert!(store.insert_request(&request).await.is_ok());

        let cancelled = store.cancel_request(request_id).await;
        assert!(matches!(cancelled, Ok(Some(_))));

        let offer = LoanOffer::new(request_id, UserId::new());
        let result = store.insert_offer(&offer).await;
        assert!(matches!(result, Err(MarketError::RequestClosed(_))));

        // Nothing landed.
        let offers = store.offers_for_request(request_id).await;
        assert!(matches!(offers, Ok(offers) if offers.is_empty()));
    }

    #[tokio::test]
    async fn insert_offer_on_missing_request_is_not_found() {
        let store = InMemoryStore::new();
        let offer = LoanOffer::new(RequestId::new(), UserId::new());
        let result = store.insert_offer(&offer).await;
        assert!(matches!(result, Err(MarketError::RequestNotFound(_))));
    }
}
