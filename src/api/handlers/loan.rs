//! Loan handlers: agreement formation and the lifecycle transitions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};

use crate::api::dto::{FormAgreementBody, InitiateReturnBody, LoanDto, MyLoansDto};
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::domain::LoanId;
use crate::error::{ErrorResponse, MarketError};

/// `POST /loans/agreements` — Accept one offer and form a binding loan.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] on bad terms,
/// [`MarketError::Permission`] unless the caller posted the request, and
/// [`MarketError::OfferUnavailable`] when the offer was already settled.
#[utoipa::path(
    post,
    path = "/loans/agreements",
    tag = "Loans",
    summary = "Form a loan agreement",
    description = "Accepts exactly one pending offer. Atomically rejects every sibling offer, fulfills the request, and creates the loan awaiting handover. Of concurrent accepts against one request, exactly one succeeds; the rest receive 409.",
    request_body = FormAgreementBody,
    responses(
        (status = 201, description = "Loan formed", body = LoanDto),
        (status = 400, description = "Invalid return date, term, or photo URL", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not the requester", body = ErrorResponse),
        (status = 404, description = "Offer not found", body = ErrorResponse),
        (status = 409, description = "Offer no longer pending", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn form_agreement(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<FormAgreementBody>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .form_agreement(
            body.offer_id,
            principal.user_id,
            &body.agreed_return_date,
            &body.digital_term,
            &body.handover_photo_url,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LoanDto::from(loan))))
}

/// `GET /my-loans` — The caller's loans, lent and borrowed.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/my-loans",
    tag = "Loans",
    summary = "List the caller's loans",
    description = "Returns every loan the caller is a party to, split into loans where they lend and loans where they borrow, newest first.",
    responses(
        (status = 200, description = "Loans by role", body = MyLoansDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn my_loans(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, MarketError> {
    let (lent, borrowed) = state.loan_service.my_loans(principal.user_id).await?;

    Ok(Json(MyLoansDto {
        lent: lent.into_iter().map(LoanDto::from).collect(),
        borrowed: borrowed.into_iter().map(LoanDto::from).collect(),
    }))
}

/// `GET /loans/:id` — Get a single loan.
///
/// # Errors
///
/// Returns [`MarketError::Permission`] if the caller is neither the owner
/// nor the borrower.
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "Loans",
    summary = "Get loan details",
    description = "Returns a loan's terms, status, and return record. Visible only to its two parties.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan UUID"),
    ),
    responses(
        (status = 200, description = "Loan details", body = LoanDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not a party to the loan", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn get_loan(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .get_loan_for(LoanId::from_uuid(id), principal.user_id)
        .await?;

    Ok(Json(LoanDto::from(loan)))
}

/// `PATCH /loans/:id/confirm-handover` — Owner confirms the item changed
/// hands.
///
/// # Errors
///
/// Returns [`MarketError::Permission`] unless the caller is the owner, and
/// [`MarketError::InvalidStateTransition`] if the loan is past handover.
#[utoipa::path(
    patch,
    path = "/loans/{id}/confirm-handover",
    tag = "Loans",
    summary = "Confirm handover",
    description = "Owner-only. Moves the loan from pending_handover to active, recording the handover timestamp.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan UUID"),
    ),
    responses(
        (status = 200, description = "Loan is now active", body = LoanDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 409, description = "Loan is not awaiting handover", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn confirm_handover(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .confirm_handover(LoanId::from_uuid(id), principal.user_id)
        .await?;

    Ok(Json(LoanDto::from(loan)))
}

/// `PATCH /loans/:id/initiate-return` — Borrower reports the item returned.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] on an empty condition,
/// [`MarketError::Permission`] unless the caller is the borrower, and
/// [`MarketError::InvalidStateTransition`] when the loan is not active.
#[utoipa::path(
    patch,
    path = "/loans/{id}/initiate-return",
    tag = "Loans",
    summary = "Initiate return",
    description = "Borrower-only. Records the item's condition (with optional notes and photo) and moves the loan from active to pending_return_confirmation.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan UUID"),
    ),
    request_body = InitiateReturnBody,
    responses(
        (status = 200, description = "Return awaiting owner confirmation", body = LoanDto),
        (status = 400, description = "Empty condition or malformed photo URL", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not the borrower", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 409, description = "Loan is not active", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn initiate_return(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
    Json(body): Json<InitiateReturnBody>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .initiate_return(
            LoanId::from_uuid(id),
            principal.user_id,
            &body.condition,
            body.notes.as_deref(),
            body.return_photo_url.as_deref(),
        )
        .await?;

    Ok(Json(LoanDto::from(loan)))
}

/// `PATCH /loans/:id/confirm-return` — Owner confirms the item is back.
///
/// # Errors
///
/// Returns [`MarketError::Permission`] unless the caller is the owner, and
/// [`MarketError::InvalidStateTransition`] unless a return is pending.
#[utoipa::path(
    patch,
    path = "/loans/{id}/confirm-return",
    tag = "Loans",
    summary = "Confirm return",
    description = "Owner-only. Closes the loan as returned, recording the actual return timestamp.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan UUID"),
    ),
    responses(
        (status = 200, description = "Loan closed as returned", body = LoanDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not the owner", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 409, description = "No return pending on this loan", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn confirm_return(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .confirm_return(LoanId::from_uuid(id), principal.user_id)
        .await?;

    Ok(Json(LoanDto::from(loan)))
}

/// `PATCH /loans/:id/raise-dispute` — Either party contests the loan.
///
/// # Errors
///
/// Returns [`MarketError::Permission`] if the caller is neither party, and
/// [`MarketError::InvalidStateTransition`] once the loan is terminal.
#[utoipa::path(
    patch,
    path = "/loans/{id}/raise-dispute",
    tag = "Loans",
    summary = "Raise a dispute",
    description = "Either party may flag the loan from any non-terminal state. Disputed is terminal; resolution happens outside this service.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan UUID"),
    ),
    responses(
        (status = 200, description = "Loan marked disputed", body = LoanDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not a party to the loan", body = ErrorResponse),
        (status = 404, description = "Loan not found", body = ErrorResponse),
        (status = 409, description = "Loan is already closed", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn raise_dispute(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let loan = state
        .loan_service
        .raise_dispute(LoanId::from_uuid(id), principal.user_id)
        .await?;

    Ok(Json(LoanDto::from(loan)))
}

/// Loan and agreement routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loans/agreements", post(form_agreement))
        .route("/my-loans", get(my_loans))
        .route("/loans/{id}", get(get_loan))
        .route("/loans/{id}/confirm-handover", patch(confirm_handover))
        .route("/loans/{id}/initiate-return", patch(initiate_return))
        .route("/loans/{id}/confirm-return", patch(confirm_return))
        .route("/loans/{id}/raise-dispute", patch(raise_dispute))
}
