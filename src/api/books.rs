//! Catalog endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::book::{Book, BookQuery, CreateBook},
};

use super::AuthenticatedMember;

/// List books, optionally filtered by title/author and availability
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(BookQuery),
    responses(
        (status = 200, description = "Books in the catalog", body = Vec<Book>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    AuthenticatedMember(_claims): AuthenticatedMember,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = state.services.catalog.search_books(query).await?;
    Ok(Json(books))
}

/// Get book details by ID
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = Book),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(_claims): AuthenticatedMember,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Book>> {
    let book = state.services.catalog.get_book(id).await?;
    Ok(Json(book))
}

/// Add a book to the catalog
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Missing title, author or description"),
        (status = 403, description = "Administrator privileges required")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Json(book): Json<CreateBook>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let created = state.services.catalog.add_book(&claims, book).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Stream catalog changes as Server-Sent Events.
///
/// The first event (`snapshot`) carries the full catalog; later events are
/// `book_added`, `book_borrowed` and `book_returned`. Closing the connection
/// drops the subscription.
#[utoipa::path(
    get,
    path = "/books/events",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "text/event-stream of catalog changes"),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn catalog_events(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let (snapshot, subscription) = state.services.catalog.watch().await?;
    tracing::debug!(member_id = %claims.member_id, "Catalog event stream opened");

    let first = tokio_stream::once(json_event("snapshot", &snapshot));
    let changes = subscription
        .into_stream()
        .map(|event| json_event(event.name(), &event));

    Ok(Sse::new(first.chain(changes)).keep_alive(KeepAlive::default()))
}

fn json_event<T: serde::Serialize>(name: &str, payload: &T) -> Result<Event, Infallible> {
    let event = Event::default().event(name);
    Ok(match serde_json::to_string(payload) {
        Ok(data) => event.data(data),
        Err(e) => {
            tracing::error!("Failed to serialize catalog event: {}", e);
            event.comment("serialization error")
        }
    })
}
