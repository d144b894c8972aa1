//! Domain events emitted by the lending workflow.
//!
//! Every observable state change publishes a [`LoanEvent`] through the
//! [`super::EventBus`]. The notification/chat bridge consumes these events
//! downstream; publishing is fire-and-forget and never blocks or fails a
//! workflow transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{LoanId, OfferId, RequestId, UserId};

/// Event emitted after a committed workflow mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum LoanEvent {
    /// A neighbor made an offer against an open request.
    OfferCreated {
        /// Request the offer targets.
        request_id: RequestId,
        /// The new offer.
        offer_id: OfferId,
        /// Resident who made the offer.
        offerer_id: UserId,
        /// Requester to notify.
        requester_id: UserId,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An agreement was formed: exactly one offer was accepted and a loan
    /// created.
    LoanFormed {
        /// The new loan.
        loan_id: LoanId,
        /// Originating request.
        request_id: RequestId,
        /// The lender.
        owner_id: UserId,
        /// The borrower.
        borrower_id: UserId,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The owner confirmed the return; the loan closed normally.
    LoanReturned {
        /// The closed loan.
        loan_id: LoanId,
        /// The lender.
        owner_id: UserId,
        /// The borrower.
        borrower_id: UserId,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A party contested the loan; it is now pending manual review.
    LoanDisputed {
        /// The disputed loan.
        loan_id: LoanId,
        /// The lender.
        owner_id: UserId,
        /// The borrower.
        borrower_id: UserId,
        /// Party who raised the dispute.
        raised_by: UserId,
        /// Emission timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl LoanEvent {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::OfferCreated { .. } => "offer_created",
            Self::LoanFormed { .. } => "loan_formed",
            Self::LoanReturned { .. } => "loan_returned",
            Self::LoanDisputed { .. } => "loan_disputed",
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn loan_formed_event_type() {
        let event = LoanEvent::LoanFormed {
            loan_id: LoanId::new(),
            request_id: RequestId::new(),
            owner_id: UserId::new(),
            borrower_id: UserId::new(),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type_str(), "loan_formed");
    }

    #[test]
    fn events_serialize_with_tag() {
        let owner = UserId::new();
        let event = LoanEvent::LoanDisputed {
            loan_id: LoanId::new(),
            owner_id: owner,
            borrower_id: UserId::new(),
            raised_by: owner,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"event_type\":\"loan_disputed\""));
        assert!(json.contains("raised_by"));
    }
}
