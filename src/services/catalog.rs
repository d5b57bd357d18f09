//! Catalog management service

use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{ActiveBorrow, Book, BookQuery, CreateBook, NewBook},
        member::MemberClaims,
    },
    repository::Repository,
    services::events::{CatalogEvent, CatalogEvents, CatalogSubscription},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    events: CatalogEvents,
}

impl CatalogService {
    pub fn new(repository: Repository, events: CatalogEvents) -> Self {
        Self { repository, events }
    }

    /// Search books by title or author
    pub async fn search_books(&self, query: BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.list_books(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .read_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Add a book to the catalog (admins only)
    pub async fn add_book(&self, claims: &MemberClaims, book: CreateBook) -> AppResult<Book> {
        claims.require_admin()?;
        book.validate()?;

        let new_book = NewBook {
            title: required(&book.title, "Title")?,
            author: required(&book.author, "Author")?,
            description: required(&book.description, "Description")?,
        };

        let created = self.repository.books.create_book(new_book).await?;
        tracing::info!(book_id = %created.id, title = %created.title, "Book added to catalog");

        self.events.publish(CatalogEvent::BookAdded(created.clone()));
        Ok(created)
    }

    /// Who holds which book (admins only)
    pub async fn active_borrows(&self, claims: &MemberClaims) -> AppResult<Vec<ActiveBorrow>> {
        claims.require_admin()?;
        let books = self.repository.books.all_active_borrows().await?;
        Ok(books.iter().filter_map(Book::as_active_borrow).collect())
    }

    /// Subscribe to catalog changes and read the current catalog.
    ///
    /// The subscription is taken before the snapshot is read, so a change
    /// landing in between shows up in the stream rather than being lost.
    pub async fn watch(&self) -> AppResult<(Vec<Book>, CatalogSubscription)> {
        let subscription = self.events.subscribe();
        let snapshot = self.repository.books.list_books(BookQuery::default()).await?;
        tracing::debug!(subscribers = self.events.subscriber_count(), "Catalog watcher attached");
        Ok((snapshot, subscription))
    }
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}
