//! A neighbor's pledge to lend against a specific request.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::loan_request::UnknownStatus;
use super::{OfferId, RequestId, UserId};

/// Status of a [`LoanOffer`].
///
/// Offers are created `pending` and transition together at agreement time:
/// the chosen one to `accepted`, every other pending sibling to `rejected`.
/// An offer never reverts, and exactly one offer per request may ever reach
/// `accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    /// Waiting for the requester's decision.
    Pending,
    /// Chosen by the requester; a loan was formed from this offer.
    Accepted,
    /// Closed out when a sibling offer was accepted.
    Rejected,
}

impl OfferStatus {
    /// Returns the status as its persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for OfferStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A neighbor's pledge to fulfill a specific [`super::LoanRequest`].
///
/// Duplicate offers by the same offerer on one request are tolerated and
/// treated independently; self-offers are rejected at creation.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanOffer {
    /// Unique identifier.
    pub id: OfferId,
    /// Request the offer is made against.
    pub loan_request_id: RequestId,
    /// Resident pledging to lend.
    pub offerer_id: UserId,
    /// Current lifecycle status.
    pub status: OfferStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LoanOffer {
    /// Creates a new offer in the `pending` state.
    #[must_use]
    pub fn new(loan_request_id: RequestId, offerer_id: UserId) -> Self {
        Self {
            id: OfferId::new(),
            loan_request_id,
            offerer_id,
            status: OfferStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn new_offer_starts_pending() {
        let offer = LoanOffer::new(RequestId::new(), UserId::new());
        assert_eq!(offer.status, OfferStatus::Pending);
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            OfferStatus::Pending,
            OfferStatus::Accepted,
            OfferStatus::Rejected,
        ] {
            let parsed: Result<OfferStatus, _> = status.as_str().parse();
            let Ok(parsed) = parsed else {
                panic!("round trip failed for {status:?}");
            };
            assert_eq!(parsed, status);
        }
    }
}
