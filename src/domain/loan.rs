//! The binding lending agreement and its execution record.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::loan_request::UnknownStatus;
use super::{LoanId, OfferId, RequestId, UserId};

/// Status of a [`Loan`].
///
/// The machine only moves forward:
///
/// ```text
/// pending_handover → active → pending_return_confirmation → returned
///        └──────────────┴──────────────┴──→ disputed
/// ```
///
/// `returned` and `disputed` are terminal; `disputed` is reachable from any
/// non-terminal state by either party and is resolved manually by an admin
/// outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Agreement formed; the item has not been handed over yet.
    PendingHandover,
    /// The item is in the borrower's hands.
    Active,
    /// The borrower reported the item returned; the owner must confirm.
    PendingReturnConfirmation,
    /// The owner confirmed the return. Terminal.
    Returned,
    /// Either party contested the handover or return. Terminal.
    Disputed,
}

impl LoanStatus {
    /// Returns the status as its persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingHandover => "pending_handover",
            Self::Active => "active",
            Self::PendingReturnConfirmation => "pending_return_confirmation",
            Self::Returned => "returned",
            Self::Disputed => "disputed",
        }
    }

    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Returned | Self::Disputed)
    }
}

impl FromStr for LoanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_handover" => Ok(Self::PendingHandover),
            "active" => Ok(Self::Active),
            "pending_return_confirmation" => Ok(Self::PendingReturnConfirmation),
            "returned" => Ok(Self::Returned),
            "disputed" => Ok(Self::Disputed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Role a resident plays on a formed [`Loan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanRole {
    /// The lender: the resident whose offer was accepted.
    Owner,
    /// The original requester.
    Borrower,
}

/// The binding agreement created when a requester accepts exactly one offer.
///
/// Never deleted: the row is the audit trail of the transaction. The
/// `owner_id`/`borrower_id` roles are fixed at formation and never swap.
#[derive(Debug, Clone, PartialEq)]
pub struct Loan {
    /// Unique identifier.
    pub id: LoanId,
    /// Back-reference to the originating request (read-only, for display).
    pub loan_request_id: RequestId,
    /// Back-reference to the accepted offer (read-only, for display).
    pub offer_id: OfferId,
    /// The lender.
    pub owner_id: UserId,
    /// The original requester.
    pub borrower_id: UserId,
    /// Return date both parties agreed on.
    pub agreed_return_date: NaiveDate,
    /// Free-text liability clause recorded at formation.
    pub digital_term: String,
    /// Photo of the item taken at agreement time.
    pub handover_photo_url: String,
    /// Current lifecycle status.
    pub status: LoanStatus,
    /// When the owner confirmed the physical handover.
    pub handover_date: Option<DateTime<Utc>>,
    /// When the owner confirmed the return.
    pub actual_return_date: Option<DateTime<Utc>>,
    /// Condition notes recorded by the borrower when initiating the return.
    pub return_condition_notes: Option<String>,
    /// Optional photo supplied with the return.
    pub return_photo_url: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Returns which role, if any, the given user plays on this loan.
    #[must_use]
    pub fn role_of(&self, user_id: UserId) -> Option<LoanRole> {
        if user_id == self.owner_id {
            Some(LoanRole::Owner)
        } else if user_id == self.borrower_id {
            Some(LoanRole::Borrower)
        } else {
            None
        }
    }

    /// Whether the given user is one of the two parties on the loan.
    #[must_use]
    pub fn is_party(&self, user_id: UserId) -> bool {
        self.role_of(user_id).is_some()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn make_loan(owner: UserId, borrower: UserId) -> Loan {
        let now = Utc::now();
        Loan {
            id: LoanId::new(),
            loan_request_id: RequestId::new(),
            offer_id: OfferId::new(),
            owner_id: owner,
            borrower_id: borrower,
            agreed_return_date: now.date_naive(),
            digital_term: "returned in same condition".to_string(),
            handover_photo_url: "http://photos.example/drill.jpg".to_string(),
            status: LoanStatus::PendingHandover,
            handover_date: None,
            actual_return_date: None,
            return_condition_notes: None,
            return_photo_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn role_resolution() {
        let owner = UserId::new();
        let borrower = UserId::new();
        let loan = make_loan(owner, borrower);

        assert_eq!(loan.role_of(owner), Some(LoanRole::Owner));
        assert_eq!(loan.role_of(borrower), Some(LoanRole::Borrower));
        assert_eq!(loan.role_of(UserId::new()), None);
        assert!(loan.is_party(owner));
        assert!(!loan.is_party(UserId::new()));
    }

    #[test]
    fn terminal_states() {
        assert!(LoanStatus::Returned.is_terminal());
        assert!(LoanStatus::Disputed.is_terminal());
        assert!(!LoanStatus::PendingHandover.is_terminal());
        assert!(!LoanStatus::Active.is_terminal());
        assert!(!LoanStatus::PendingReturnConfirmation.is_terminal());
    }

    #[test]
    fn status_string_round_trip() {
        for status in [
            LoanStatus::PendingHandover,
            LoanStatus::Active,
            LoanStatus::PendingReturnConfirmation,
            LoanStatus::Returned,
            LoanStatus::Disputed,
        ] {
            let parsed: Result<LoanStatus, _> = status.as_str().parse();
            let Ok(parsed) = parsed else {
                panic!("round trip failed for {status:?}");
            };
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&LoanStatus::PendingReturnConfirmation).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        assert_eq!(json, "\"pending_return_confirmation\"");
    }
}
