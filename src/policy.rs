//! Lending policy engine.
//!
//! Pure decision functions over an actor, a freshly read book and the actor's
//! active borrow count. Nothing here touches storage: an `Approved` decision
//! tells the caller which [`BookPatch`] to persist with a conditional update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    book::{Book, BookPatch, LendingState},
    member::{Actor, Role},
};

/// Books a `user` may hold at once unless configured otherwise
pub const DEFAULT_MAX_BORROW: u32 = 2;

/// Club lending rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LendingPolicy {
    /// Maximum number of unreturned books per borrowing member
    pub max_borrow: u32,
    /// Whether admins may borrow; admins are oversight-only when false
    pub admin_can_borrow: bool,
    /// Whether an admin may return a book on a member's behalf
    pub allow_admin_return: bool,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            max_borrow: DEFAULT_MAX_BORROW,
            admin_can_borrow: false,
            allow_admin_return: false,
        }
    }
}

/// Why a lending action was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// The book is held by someone
    BookUnavailable,
    /// The actor already holds the maximum number of books
    BorrowLimitReached { limit: u32 },
    /// The actor's role forbids the action
    RoleNotPermitted,
    /// Return attempted on a book nobody holds
    NotCurrentlyBorrowed,
    /// Return attempted by a member who is not the borrower
    NotBorrower,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::BookUnavailable => write!(f, "This book is already borrowed"),
            RejectReason::BorrowLimitReached { limit } => {
                write!(f, "You can only borrow {} books at a time", limit)
            }
            RejectReason::RoleNotPermitted => {
                write!(f, "Your role is not permitted to perform this action")
            }
            RejectReason::NotCurrentlyBorrowed => write!(f, "This book is not currently borrowed"),
            RejectReason::NotBorrower => write!(f, "Only the borrower can return this book"),
        }
    }
}

/// Outcome of a policy evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Decision {
    Approved,
    Rejected(RejectReason),
}

impl Decision {
    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            Decision::Approved => None,
            Decision::Rejected(reason) => Some(*reason),
        }
    }
}

impl LendingPolicy {
    pub fn role_may_borrow(&self, role: Role) -> bool {
        match role {
            Role::User => true,
            Role::Admin => self.admin_can_borrow,
        }
    }

    /// Decide whether `actor` may borrow `book` while holding `active_borrows` books
    pub fn evaluate_borrow(&self, actor: &Actor, book: &Book, active_borrows: u32) -> Decision {
        if !self.role_may_borrow(actor.role) {
            return Decision::Rejected(RejectReason::RoleNotPermitted);
        }
        if book.lending_state() != LendingState::Available {
            return Decision::Rejected(RejectReason::BookUnavailable);
        }
        if active_borrows >= self.max_borrow {
            return Decision::Rejected(RejectReason::BorrowLimitReached {
                limit: self.max_borrow,
            });
        }
        Decision::Approved
    }

    /// Decide whether `actor` may return `book`
    pub fn evaluate_return(&self, actor: &Actor, book: &Book) -> Decision {
        if book.lending_state() != LendingState::Borrowed || !book.is_held() {
            return Decision::Rejected(RejectReason::NotCurrentlyBorrowed);
        }
        if book.is_held_by(&actor.email) {
            return Decision::Approved;
        }
        match actor.role {
            Role::Admin if self.allow_admin_return => Decision::Approved,
            Role::Admin => Decision::Rejected(RejectReason::RoleNotPermitted),
            Role::User => Decision::Rejected(RejectReason::NotBorrower),
        }
    }
}

/// Patch to persist after an approved borrow
pub fn borrow_patch(actor: &Actor, now: DateTime<Utc>) -> BookPatch {
    BookPatch::Borrow {
        borrowed_by: actor.email.clone(),
        borrowed_at: now,
    }
}

/// Patch to persist after an approved return of `book`.
///
/// The patch names the borrow it closes, so it cannot land on a later
/// borrow of the same book. `None` when nobody holds the book.
pub fn return_patch(book: &Book) -> Option<BookPatch> {
    book.return_patch()
}
