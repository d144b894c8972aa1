//! A resident's public ask to borrow an item.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CondoId, RequestId, UserId};

/// Status of a [`LoanRequest`].
///
/// A request is created `open`, becomes `fulfilled` exactly once when an
/// agreement is formed from one of its offers, or `cancelled` by its
/// requester while still open. A request outside `open` accepts no new
/// offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Accepting offers.
    Open,
    /// An agreement was formed from one of the request's offers.
    Fulfilled,
    /// Withdrawn by the requester before any agreement was formed.
    Cancelled,
}

impl RequestStatus {
    /// Returns the status as its persisted string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Fulfilled => "fulfilled",
            Self::Cancelled => "cancelled",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "fulfilled" => Ok(Self::Fulfilled),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A persisted status string did not match any known variant.
#[derive(Debug, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// A resident's ask for a borrowable item.
///
/// `condo_id` is fixed at creation from the requester's own condominium and
/// scopes all visibility queries.
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRequest {
    /// Unique identifier.
    pub id: RequestId,
    /// Resident who posted the ask.
    pub requester_id: UserId,
    /// Condominium the request belongs to.
    pub condo_id: CondoId,
    /// Short title of the item being asked for.
    pub title: String,
    /// Optional free-text details.
    pub description: Option<String>,
    /// Current lifecycle status.
    pub status: RequestStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl LoanRequest {
    /// Creates a new request in the `open` state.
    #[must_use]
    pub fn new(
        requester_id: UserId,
        condo_id: CondoId,
        title: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            requester_id,
            condo_id,
            title,
            description,
            status: RequestStatus::Open,
            created_at: Utc::now(),
        }
    }

    /// Whether the request still accepts offers.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Open
    }
}
