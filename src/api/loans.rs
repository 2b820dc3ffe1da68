//! Borrow / return endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::loan::{Loan, LoanRequest},
};

use super::AuthenticatedUser;

/// Borrow response
#[derive(Serialize, ToSchema)]
pub struct BorrowResponse {
    /// Created loan
    pub loan: Loan,
    /// Status message
    pub message: String,
}

/// Return response
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Closed loan
    pub loan: Loan,
    /// Status message
    pub message: String,
}

/// Borrow a book for a reader
#[utoipa::path(
    post,
    path = "/loans/borrow",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 201, description = "Loan created", body = BorrowResponse),
        (status = 400, description = "No copies available or borrow limit reached"),
        (status = 404, description = "Reader or book not found")
    )
)]
pub async fn borrow(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<LoanRequest>,
) -> AppResult<(StatusCode, Json<BorrowResponse>)> {
    let loan = state
        .services
        .loans
        .borrow(request.reader_id, request.book_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            loan,
            message: "Book borrowed successfully".to_string(),
        }),
    ))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = LoanRequest,
    responses(
        (status = 200, description = "Book returned", body = ReturnResponse),
        (status = 404, description = "No open loan for this reader and book"),
        (status = 500, description = "Open loan references a missing book")
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Json(request): Json<LoanRequest>,
) -> AppResult<Json<ReturnResponse>> {
    let loan = state
        .services
        .loans
        .return_book(request.reader_id, request.book_id)
        .await?;

    Ok(Json(ReturnResponse {
        loan,
        message: "Book returned successfully".to_string(),
    }))
}
