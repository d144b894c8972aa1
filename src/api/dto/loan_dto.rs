//! Loan and agreement DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Loan, LoanId, LoanStatus, OfferId, RequestId, UserId};

/// Request body for `POST /loans/agreements`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FormAgreementBody {
    /// The pending offer the requester accepts.
    pub offer_id: OfferId,
    /// Agreed return date (`YYYY-MM-DD` or RFC 3339).
    pub agreed_return_date: String,
    /// Free-text liability clause.
    pub digital_term: String,
    /// Photo of the item taken at agreement time.
    pub handover_photo_url: String,
}

/// Request body for `PATCH /loans/:id/initiate-return`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InitiateReturnBody {
    /// Condition of the item as reported by the borrower.
    pub condition: String,
    /// Optional extra notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Optional photo of the returned item.
    #[serde(default)]
    pub return_photo_url: Option<String>,
}

/// A loan as exposed over the wire.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoanDto {
    /// Loan identifier.
    pub id: LoanId,
    /// Originating request.
    pub loan_request_id: RequestId,
    /// Accepted offer.
    pub offer_id: OfferId,
    /// The lender.
    pub owner_id: UserId,
    /// The borrower.
    pub borrower_id: UserId,
    /// Agreed return date.
    pub agreed_return_date: NaiveDate,
    /// Liability clause recorded at formation.
    pub digital_term: String,
    /// Item photo recorded at formation.
    pub handover_photo_url: String,
    /// Lifecycle status.
    pub status: LoanStatus,
    /// When the handover was confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handover_date: Option<DateTime<Utc>>,
    /// When the return was confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Borrower's condition notes from the return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_condition_notes: Option<String>,
    /// Borrower's return photo.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_photo_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Loan> for LoanDto {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            loan_request_id: loan.loan_request_id,
            offer_id: loan.offer_id,
            owner_id: loan.owner_id,
            borrower_id: loan.borrower_id,
            agreed_return_date: loan.agreed_return_date,
            digital_term: loan.digital_term,
            handover_photo_url: loan.handover_photo_url,
            status: loan.status,
            handover_date: loan.handover_date,
            actual_return_date: loan.actual_return_date,
            return_condition_notes: loan.return_condition_notes,
            return_photo_url: loan.return_photo_url,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// Response body for `GET /my-loans`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyLoansDto {
    /// Loans where the caller is the owner.
    pub lent: Vec<LoanDto>,
    /// Loans where the caller is the borrower.
    pub borrowed: Vec<LoanDto>,
}
