//! Error types with HTTP status code mapping.
//!
//! [`MarketError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and a structured JSON error
//! response. Business-rule violations are detected synchronously inside the
//! engines and surface here; persistence failures propagate as a generic
//! 500 without leaking internals.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::{LoanId, LoanStatus, OfferId, RequestId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2202,
///     "message": "offer no longer available",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`MarketError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category          | HTTP Status               |
/// |-----------|-------------------|---------------------------|
/// | 1000–1999 | Validation        | 400 Bad Request           |
/// | 2000–2099 | Not Found         | 404 Not Found             |
/// | 2100–2199 | Permission        | 403 Forbidden             |
/// | 2200–2299 | Stale state       | 409 Conflict              |
/// | 2400–2499 | Authentication    | 401 Unauthorized          |
/// | 3000–3999 | Server            | 500 Internal Server Error |
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// Request validation failed (malformed input, the client's fault).
    #[error("invalid request: {0}")]
    Validation(String),

    /// A resident tried to offer on their own request.
    #[error("cannot offer on your own request")]
    SelfOffer,

    /// Loan request with the given ID was not found (or is outside the
    /// caller's condominium).
    #[error("loan request not found: {0}")]
    RequestNotFound(RequestId),

    /// Offer with the given ID was not found.
    #[error("offer not found: {0}")]
    OfferNotFound(OfferId),

    /// Loan with the given ID was not found.
    #[error("loan not found: {0}")]
    LoanNotFound(LoanId),

    /// Authenticated but not authorized for this entity or action.
    #[error("permission denied: {0}")]
    Permission(String),

    /// The request stopped accepting offers before this operation landed.
    #[error("loan request {0} is no longer open")]
    RequestClosed(RequestId),

    /// The offer was already accepted or rejected by a prior agreement
    /// formation.
    #[error("offer {0} is no longer available")]
    OfferUnavailable(OfferId),

    /// The loan's current status does not allow the requested transition.
    #[error("loan {loan_id} cannot make this transition from status {status:?}")]
    InvalidStateTransition {
        /// Loan the transition was attempted on.
        loan_id: LoanId,
        /// Status observed when the transition was rejected.
        status: LoanStatus,
    },

    /// Missing or invalid bearer token.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MarketError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::SelfOffer => 1002,
            Self::RequestNotFound(_) => 2001,
            Self::OfferNotFound(_) => 2002,
            Self::LoanNotFound(_) => 2003,
            Self::Permission(_) => 2101,
            Self::RequestClosed(_) => 2201,
            Self::OfferUnavailable(_) => 2202,
            Self::InvalidStateTransition { .. } => 2203,
            Self::Unauthorized(_) => 2401,
            Self::Persistence(_) => 3001,
            Self::Internal(_) => 3000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::SelfOffer => StatusCode::BAD_REQUEST,
            Self::RequestNotFound(_) | Self::OfferNotFound(_) | Self::LoanNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Permission(_) => StatusCode::FORBIDDEN,
            Self::RequestClosed(_)
            | Self::OfferUnavailable(_)
            | Self::InvalidStateTransition { .. } => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Do not leak backend internals to clients.
        let message = match &self {
            Self::Persistence(_) | Self::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message,
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

impl From<sqlx::Error> for MarketError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(
            MarketError::Validation("bad".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(MarketError::SelfOffer.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            MarketError::RequestNotFound(RequestId::new()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MarketError::Permission("nope".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            MarketError::OfferUnavailable(OfferId::new()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MarketError::InvalidStateTransition {
                loan_id: LoanId::new(),
                status: LoanStatus::Returned,
            }
            .status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MarketError::Persistence("db down".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn server_errors_do_not_leak_details() {
        let response = MarketError::Persistence("connection refused at 10.0.0.5".into());
        let code = response.error_code();
        assert_eq!(code, 3001);
        // The response body replaces the message; the variant keeps it for logs.
        let rendered = response.to_string();
        assert!(rendered.contains("connection refused"));
    }
}
