//! Loan request DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::LoanOfferDto;
use crate::domain::{CondoId, LoanRequest, RequestId, RequestStatus, UserId};

/// Request body for `POST /loan-requests`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateRequestBody {
    /// Short title of the item being asked for.
    pub title: String,
    /// Optional free-text details.
    #[serde(default)]
    pub description: Option<String>,
}

/// A loan request as exposed over the wire.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequestDto {
    /// Request identifier.
    pub id: RequestId,
    /// Resident who posted the ask.
    pub requester_id: UserId,
    /// Condominium the request belongs to.
    pub condo_id: CondoId,
    /// Short title.
    pub title: String,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: RequestStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<LoanRequest> for LoanRequestDto {
    fn from(request: LoanRequest) -> Self {
        Self {
            id: request.id,
            requester_id: request.requester_id,
            condo_id: request.condo_id,
            title: request.title,
            description: request.description,
            status: request.status,
            created_at: request.created_at,
        }
    }
}

/// Response body for `GET /loan-requests/:id`: the request plus its offers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithOffersDto {
    /// The request itself.
    #[serde(flatten)]
    pub request: LoanRequestDto,
    /// All offers made against it, oldest first.
    pub offers: Vec<LoanOfferDto>,
}
