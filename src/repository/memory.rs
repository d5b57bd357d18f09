//! In-memory store implementing both store traits.
//!
//! Each collection sits behind one lock, so a lending snapshot and a
//! conditional update each observe a single consistent state.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CatalogStore, LendingSnapshot, MemberStore, UpdateOutcome};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookPatch, BookQuery, NewBook},
        member::{Member, MemberRecord, NewMember, Role},
    },
};

#[derive(Default)]
pub struct InMemoryStore {
    books: RwLock<HashMap<Uuid, Book>>,
    members: RwLock<HashMap<Uuid, MemberRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn count_held_by(books: &HashMap<Uuid, Book>, email: &str) -> i64 {
    books.values().filter(|b| b.is_held_by(email)).count() as i64
}

fn sorted_by_borrow_date(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by_key(|b| b.borrower.as_ref().map(|r| r.borrowed_at));
    books
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn read_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.books.read().await.get(&id).cloned())
    }

    async fn lending_snapshot(&self, book_id: Uuid, actor_email: &str) -> AppResult<Option<LendingSnapshot>> {
        let books = self.books.read().await;
        Ok(books.get(&book_id).map(|book| LendingSnapshot {
            book: book.clone(),
            active_borrows: count_held_by(&books, actor_email),
        }))
    }

    async fn conditional_update_book(
        &self,
        id: Uuid,
        expected_available: bool,
        patch: BookPatch,
    ) -> AppResult<UpdateOutcome> {
        let mut books = self.books.write().await;
        let Some(book) = books.get_mut(&id) else {
            return Ok(UpdateOutcome::PreconditionFailed);
        };

        if book.available != expected_available || !patch.applies_to(book) {
            return Ok(UpdateOutcome::PreconditionFailed);
        }

        book.apply(patch);
        Ok(UpdateOutcome::Applied(book.clone()))
    }

    async fn count_active_borrows(&self, actor_email: &str) -> AppResult<i64> {
        Ok(count_held_by(&*self.books.read().await, actor_email))
    }

    async fn create_book(&self, book: NewBook) -> AppResult<Book> {
        let book = Book::new(book);
        self.books.write().await.insert(book.id, book.clone());
        Ok(book)
    }

    async fn list_books(&self, query: BookQuery) -> AppResult<Vec<Book>> {
        let mut books: Vec<Book> = self
            .books
            .read()
            .await
            .values()
            .filter(|b| query.matches(b))
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }

    async fn active_borrows_for(&self, actor_email: &str) -> AppResult<Vec<Book>> {
        let books = self
            .books
            .read()
            .await
            .values()
            .filter(|b| b.is_held_by(actor_email))
            .cloned()
            .collect();
        Ok(sorted_by_borrow_date(books))
    }

    async fn all_active_borrows(&self) -> AppResult<Vec<Book>> {
        let books = self
            .books
            .read()
            .await
            .values()
            .filter(|b| b.is_held())
            .cloned()
            .collect();
        Ok(sorted_by_borrow_date(books))
    }
}

#[async_trait]
impl MemberStore for InMemoryStore {
    async fn read_member(&self, id: Uuid) -> AppResult<Option<Member>> {
        Ok(self.members.read().await.get(&id).cloned().map(Member::from))
    }

    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<MemberRecord>> {
        Ok(self
            .members
            .read()
            .await
            .values()
            .find(|m| m.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_member_role(&self, id: Uuid, role: Role) -> AppResult<Option<Member>> {
        let mut members = self.members.write().await;
        Ok(members.get_mut(&id).map(|record| {
            record.role = role;
            Member::from(record.clone())
        }))
    }

    async fn create_member(&self, member: NewMember) -> AppResult<Member> {
        let mut members = self.members.write().await;
        if members.values().any(|m| m.email.eq_ignore_ascii_case(&member.email)) {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let record = MemberRecord {
            id: Uuid::new_v4(),
            email: member.email,
            role: member.role,
            password_hash: member.password_hash,
            created_at: Utc::now(),
        };
        members.insert(record.id, record.clone());
        Ok(record.into())
    }
}
