//! Loan offer DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{LoanOffer, OfferId, OfferStatus, RequestId, UserId};

/// A loan offer as exposed over the wire.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanOfferDto {
    /// Offer identifier.
    pub id: OfferId,
    /// Request the offer targets.
    pub loan_request_id: RequestId,
    /// Resident pledging to lend.
    pub offerer_id: UserId,
    /// Lifecycle status.
    pub status: OfferStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<LoanOffer> for LoanOfferDto {
    fn from(offer: LoanOffer) -> Self {
        Self {
            id: offer.id,
            loan_request_id: offer.loan_request_id,
            offerer_id: offer.offerer_id,
            status: offer.status,
            created_at: offer.created_at,
        }
    }
}
