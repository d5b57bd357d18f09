//! Borrow and return orchestration.
//!
//! Each action reads a fresh snapshot, asks the lending policy for a
//! decision and persists an approved decision with a conditional update.
//! A lost race is re-evaluated once against a fresh read and never retried
//! silently.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BorrowedBook},
        member::Actor,
    },
    policy::{self, Decision, LendingPolicy, RejectReason},
    repository::{LendingSnapshot, Repository, UpdateOutcome},
    services::events::{CatalogEvent, CatalogEvents},
};

/// Result of a borrow or return request
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum LendingOutcome {
    /// The transition was persisted; carries the updated book
    Completed(Book),
    /// The policy refused the action
    Rejected(RejectReason),
}

impl LendingOutcome {
    pub fn into_result(self) -> AppResult<Book> {
        match self {
            LendingOutcome::Completed(book) => Ok(book),
            LendingOutcome::Rejected(reason) => Err(AppError::Rejected(reason)),
        }
    }
}

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    policy: LendingPolicy,
    events: CatalogEvents,
}

impl LendingService {
    pub fn new(repository: Repository, policy: LendingPolicy, events: CatalogEvents) -> Self {
        Self {
            repository,
            policy,
            events,
        }
    }

    pub fn policy(&self) -> &LendingPolicy {
        &self.policy
    }

    /// Borrow a book on behalf of a member
    pub async fn borrow(&self, member_id: Uuid, book_id: Uuid) -> AppResult<LendingOutcome> {
        let actor = self.actor(member_id).await?;
        let snapshot = self.snapshot(book_id, &actor).await?;

        if let Decision::Rejected(reason) = self.decide_borrow(&actor, &snapshot) {
            tracing::debug!(%book_id, actor = %actor.email, ?reason, "Borrow rejected");
            return Ok(LendingOutcome::Rejected(reason));
        }

        let patch = policy::borrow_patch(&actor, Utc::now());
        let expected_available = patch.expected_available();
        match self
            .repository
            .books
            .conditional_update_book(book_id, expected_available, patch)
            .await?
        {
            UpdateOutcome::Applied(book) => {
                tracing::info!(%book_id, actor = %actor.email, "Book borrowed");
                self.events.publish(CatalogEvent::BookBorrowed(book.clone()));
                Ok(LendingOutcome::Completed(book))
            }
            UpdateOutcome::PreconditionFailed => {
                tracing::warn!(%book_id, actor = %actor.email, "Borrow lost a concurrent update, re-evaluating");
                let fresh = self.snapshot(book_id, &actor).await?;
                match self.decide_borrow(&actor, &fresh) {
                    Decision::Rejected(reason) => Ok(LendingOutcome::Rejected(reason)),
                    Decision::Approved => Err(AppError::PreconditionFailed(
                        "The book changed while borrowing; please retry".to_string(),
                    )),
                }
            }
        }
    }

    /// Return a book held by a member (or by anyone, for admins when allowed)
    pub async fn return_book(&self, member_id: Uuid, book_id: Uuid) -> AppResult<LendingOutcome> {
        let actor = self.actor(member_id).await?;
        let book = self.book(book_id).await?;

        if let Decision::Rejected(reason) = self.policy.evaluate_return(&actor, &book) {
            tracing::debug!(%book_id, actor = %actor.email, ?reason, "Return rejected");
            return Ok(LendingOutcome::Rejected(reason));
        }

        let Some(patch) = policy::return_patch(&book) else {
            return Ok(LendingOutcome::Rejected(RejectReason::NotCurrentlyBorrowed));
        };
        let expected_available = patch.expected_available();
        match self
            .repository
            .books
            .conditional_update_book(book_id, expected_available, patch)
            .await?
        {
            UpdateOutcome::Applied(book) => {
                tracing::info!(%book_id, actor = %actor.email, "Book returned");
                self.events.publish(CatalogEvent::BookReturned(book.clone()));
                Ok(LendingOutcome::Completed(book))
            }
            UpdateOutcome::PreconditionFailed => {
                tracing::warn!(%book_id, actor = %actor.email, "Return lost a concurrent update, re-evaluating");
                let fresh = self.book(book_id).await?;
                match self.policy.evaluate_return(&actor, &fresh) {
                    Decision::Rejected(reason) => Ok(LendingOutcome::Rejected(reason)),
                    Decision::Approved => Err(AppError::PreconditionFailed(
                        "The book changed while returning; please retry".to_string(),
                    )),
                }
            }
        }
    }

    /// Books the member currently holds
    pub async fn my_borrows(&self, member_id: Uuid) -> AppResult<Vec<BorrowedBook>> {
        let actor = self.actor(member_id).await?;
        let books = self.repository.books.active_borrows_for(&actor.email).await?;
        Ok(books.iter().filter_map(Book::as_borrowed_book).collect())
    }

    /// Number of books the member currently holds
    pub async fn active_borrow_count(&self, member_id: Uuid) -> AppResult<i64> {
        let actor = self.actor(member_id).await?;
        self.repository.books.count_active_borrows(&actor.email).await
    }

    fn decide_borrow(&self, actor: &Actor, snapshot: &LendingSnapshot) -> Decision {
        let active = u32::try_from(snapshot.active_borrows).unwrap_or(u32::MAX);
        self.policy.evaluate_borrow(actor, &snapshot.book, active)
    }

    /// Re-read the member so the role is authoritative, not taken from the token
    async fn actor(&self, member_id: Uuid) -> AppResult<Actor> {
        self.repository
            .members
            .read_member(member_id)
            .await?
            .map(|m| m.actor())
            .ok_or_else(|| AppError::Authentication("Unknown member".to_string()))
    }

    async fn snapshot(&self, book_id: Uuid, actor: &Actor) -> AppResult<LendingSnapshot> {
        self.repository
            .books
            .lending_snapshot(book_id, &actor.email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }

    async fn book(&self, book_id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .read_book(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))
    }
}
