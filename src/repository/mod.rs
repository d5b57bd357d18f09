//! Repository layer: the catalog and member stores.
//!
//! Services only see the [`CatalogStore`] and [`MemberStore`] traits. The
//! PostgreSQL implementations live in [`books`] and [`members`]; [`memory`]
//! holds a process-local implementation of both.

pub mod books;
pub mod members;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookPatch, BookQuery, NewBook},
        member::{Member, MemberRecord, NewMember, Role},
    },
};

/// A book together with the reading actor's active borrow count, taken from
/// one consistent read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LendingSnapshot {
    pub book: Book,
    pub active_borrows: i64,
}

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The precondition held and the patch was written
    Applied(Book),
    /// The book's availability no longer matched; nothing was written
    PreconditionFailed,
}

/// Source of truth for book records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Cheap round trip used by the readiness check
    async fn ping(&self) -> AppResult<()>;

    async fn read_book(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Read a book and `actor_email`'s active borrow count together
    async fn lending_snapshot(&self, book_id: Uuid, actor_email: &str) -> AppResult<Option<LendingSnapshot>>;

    /// Apply `patch` only if the book's `available` flag still equals
    /// `expected_available` and the patch still applies (a return must match
    /// the open borrow). A missing book reports `PreconditionFailed` too.
    async fn conditional_update_book(
        &self,
        id: Uuid,
        expected_available: bool,
        patch: BookPatch,
    ) -> AppResult<UpdateOutcome>;

    async fn count_active_borrows(&self, actor_email: &str) -> AppResult<i64>;

    async fn create_book(&self, book: NewBook) -> AppResult<Book>;

    async fn list_books(&self, query: BookQuery) -> AppResult<Vec<Book>>;

    /// Books `actor_email` currently holds, oldest borrow first
    async fn active_borrows_for(&self, actor_email: &str) -> AppResult<Vec<Book>>;

    /// Every book currently held by someone, oldest borrow first
    async fn all_active_borrows(&self) -> AppResult<Vec<Book>>;
}

/// Source of truth for member records
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemberStore: Send + Sync {
    async fn read_member(&self, id: Uuid) -> AppResult<Option<Member>>;

    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<MemberRecord>>;

    /// Change a member's role; `None` when no such member exists
    async fn update_member_role(&self, id: Uuid, role: Role) -> AppResult<Option<Member>>;

    /// Insert a member; fails with `Conflict` when the email is taken
    async fn create_member(&self, member: NewMember) -> AppResult<Member>;
}

/// Main repository struct holding the configured stores
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn CatalogStore>,
    pub members: Arc<dyn MemberStore>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::PgCatalogStore::new(pool.clone())),
            members: Arc::new(members::PgMemberStore::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::InMemoryStore::new());
        Self {
            books: store.clone(),
            members: store,
        }
    }

    pub fn new(books: Arc<dyn CatalogStore>, members: Arc<dyn MemberStore>) -> Self {
        Self { books, members }
    }
}
