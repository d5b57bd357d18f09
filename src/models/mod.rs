//! Data models for Bookclub

pub mod book;
pub mod member;

// Re-export commonly used types
pub use book::{ActiveBorrow, Book, BookPatch, BookQuery, BorrowedBook, Borrower, LendingState, NewBook};
pub use member::{Actor, Member, MemberClaims, Role};
