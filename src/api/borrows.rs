//! Borrow and return endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::book::{ActiveBorrow, Book, BorrowedBook},
};

use super::AuthenticatedMember;

/// Lending action response
#[derive(Serialize, ToSchema)]
pub struct LendingResponse {
    /// Status message
    pub message: String,
    /// The book after the transition
    pub book: Book,
}

/// Borrow a book
#[utoipa::path(
    post,
    path = "/books/{id}/borrow",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book borrowed", body = LendingResponse),
        (status = 403, description = "Role not permitted to borrow", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already borrowed, or changed concurrently", body = crate::error::ErrorResponse),
        (status = 422, description = "Borrow limit reached", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<LendingResponse>> {
    let book = state
        .services
        .lending
        .borrow(claims.member_id, book_id)
        .await?
        .into_result()?;

    Ok(Json(LendingResponse {
        message: format!("{} has been borrowed!", book.title),
        book,
    }))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/books/{id}/return",
    tag = "lending",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book returned", body = LendingResponse),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book not currently borrowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<LendingResponse>> {
    let book = state
        .services
        .lending
        .return_book(claims.member_id, book_id)
        .await?
        .into_result()?;

    Ok(Json(LendingResponse {
        message: "Book returned successfully".to_string(),
        book,
    }))
}

/// Books held by the authenticated member
#[utoipa::path(
    get,
    path = "/me/borrows",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Books currently held", body = Vec<BorrowedBook>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<Vec<BorrowedBook>>> {
    let books = state.services.lending.my_borrows(claims.member_id).await?;
    Ok(Json(books))
}

/// Every book currently held, with its borrower
#[utoipa::path(
    get,
    path = "/borrows",
    tag = "lending",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active borrows", body = Vec<ActiveBorrow>),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn active_borrows(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<Vec<ActiveBorrow>>> {
    let borrows = state.services.catalog.active_borrows(&claims).await?;
    Ok(Json(borrows))
}
