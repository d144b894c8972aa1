//! Loan request handlers: post an ask, browse the board, inspect, cancel,
//! and make offers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateRequestBody, LoanOfferDto, LoanRequestDto, RequestWithOffersDto,
};
use crate::app_state::AppState;
use crate::auth::Principal;
use crate::domain::RequestId;
use crate::error::{ErrorResponse, MarketError};

/// `POST /loan-requests` — Post a new ask to the caller's condominium board.
///
/// # Errors
///
/// Returns [`MarketError::Validation`] on an empty or oversized title or
/// description.
#[utoipa::path(
    post,
    path = "/loan-requests",
    tag = "Loan Requests",
    summary = "Create a loan request",
    description = "Posts a new ask for an item. The request is visible to every other resident of the caller's condominium until fulfilled or cancelled.",
    request_body = CreateRequestBody,
    responses(
        (status = 201, description = "Request created", body = LoanRequestDto),
        (status = 400, description = "Invalid title or description", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn create_request(
    State(state): State<AppState>,
    principal: Principal,
    Json(body): Json<CreateRequestBody>,
) -> Result<impl IntoResponse, MarketError> {
    let request = state
        .loan_service
        .create_request(
            principal.user_id,
            principal.condo_id,
            &body.title,
            body.description,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LoanRequestDto::from(request))))
}

/// `GET /loan-requests` — Browse open requests from neighbors.
///
/// # Errors
///
/// Returns [`MarketError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/loan-requests",
    tag = "Loan Requests",
    summary = "List open loan requests",
    description = "Returns open requests in the caller's condominium, newest first. The caller's own requests are excluded: this is the board of asks one can respond to.",
    responses(
        (status = 200, description = "Open requests", body = Vec<LoanRequestDto>),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn list_requests(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, MarketError> {
    let requests = state
        .loan_service
        .list_open_requests(principal.condo_id, principal.user_id)
        .await?;

    let data: Vec<LoanRequestDto> = requests.into_iter().map(LoanRequestDto::from).collect();
    Ok(Json(data))
}

/// `GET /loan-requests/:id` — Get a request together with its offers.
///
/// # Errors
///
/// Returns [`MarketError::RequestNotFound`] if the request does not exist
/// or belongs to another condominium.
#[utoipa::path(
    get,
    path = "/loan-requests/{id}",
    tag = "Loan Requests",
    summary = "Get a loan request with its offers",
    description = "Returns a single request and every offer made against it, oldest offer first. Requests from other condominiums are indistinguishable from missing ones.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan request UUID"),
    ),
    responses(
        (status = 200, description = "Request with offers", body = RequestWithOffersDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn get_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let (request, offers) = state
        .loan_service
        .get_request_with_offers(RequestId::from_uuid(id), principal.condo_id)
        .await?;

    Ok(Json(RequestWithOffersDto {
        request: LoanRequestDto::from(request),
        offers: offers.into_iter().map(LoanOfferDto::from).collect(),
    }))
}

/// `DELETE /loan-requests/:id` — Cancel an open request.
///
/// # Errors
///
/// Returns [`MarketError::Permission`] if the caller did not post the
/// request, and [`MarketError::RequestClosed`] if it is no longer open.
#[utoipa::path(
    delete,
    path = "/loan-requests/{id}",
    tag = "Loan Requests",
    summary = "Cancel a loan request",
    description = "Withdraws an open request. Only the requester may cancel, and only while the request is still open; pending offers against it become moot.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan request UUID"),
    ),
    responses(
        (status = 200, description = "Request cancelled", body = LoanRequestDto),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 403, description = "Caller is not the requester", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request already fulfilled or cancelled", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn cancel_request(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let cancelled = state
        .loan_service
        .cancel_request(
            RequestId::from_uuid(id),
            principal.user_id,
            principal.condo_id,
        )
        .await?;

    Ok(Json(LoanRequestDto::from(cancelled)))
}

/// `POST /loan-requests/:id/offers` — Offer to lend against a request.
///
/// # Errors
///
/// Returns [`MarketError::SelfOffer`] for offers on the caller's own
/// request and [`MarketError::RequestClosed`] once the request stops
/// accepting offers.
#[utoipa::path(
    post,
    path = "/loan-requests/{id}/offers",
    tag = "Loan Requests",
    summary = "Make a loan offer",
    description = "Pledges to lend the requested item. Multiple residents may offer against the same request; the requester later accepts exactly one.",
    params(
        ("id" = uuid::Uuid, Path, description = "Loan request UUID"),
    ),
    responses(
        (status = 201, description = "Offer created", body = LoanOfferDto),
        (status = 400, description = "Offer on the caller's own request", body = ErrorResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 404, description = "Request not found", body = ErrorResponse),
        (status = 409, description = "Request no longer accepts offers", body = ErrorResponse),
    ),
    security(("bearer_token" = []))
)]
pub async fn create_offer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, MarketError> {
    let offer = state
        .loan_service
        .create_offer(
            RequestId::from_uuid(id),
            principal.user_id,
            principal.condo_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(LoanOfferDto::from(offer))))
}

/// Loan request routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/loan-requests", post(create_request).get(list_requests))
        .route(
            "/loan-requests/{id}",
            get(get_request).delete(cancel_request),
        )
        .route("/loan-requests/{id}/offers", post(create_offer))
}
