//! Book model and its lending sub-record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// Borrow record folded into a book.
///
/// Present once the book has been borrowed at least once; `returned` is
/// `false` while a member holds the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Borrower {
    /// Email of the member holding (or last holding) the book
    pub borrowed_by: String,
    pub borrowed_at: DateTime<Utc>,
    pub returned: bool,
}

/// Lending state of a single book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LendingState {
    Available,
    Borrowed,
}

/// Book record from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub available: bool,
    pub borrower: Option<Borrower>,
    pub created_at: DateTime<Utc>,
}

/// State change to persist after an approved lending decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookPatch {
    /// Mark unavailable and attach a fresh borrower record
    Borrow {
        borrowed_by: String,
        borrowed_at: DateTime<Utc>,
    },
    /// Mark available and flag the borrow identified by `borrowed_by` and
    /// `borrowed_at` as returned
    Return {
        borrowed_by: String,
        borrowed_at: DateTime<Utc>,
    },
}

impl BookPatch {
    /// Availability the book must have for this patch to apply
    pub fn expected_available(&self) -> bool {
        matches!(self, BookPatch::Borrow { .. })
    }

    /// Whether `book` is still in the state this patch was decided against.
    /// A return only closes the exact borrow it was approved for.
    pub fn applies_to(&self, book: &Book) -> bool {
        if book.available != self.expected_available() {
            return false;
        }
        match self {
            BookPatch::Borrow { .. } => true,
            BookPatch::Return {
                borrowed_by,
                borrowed_at,
            } => book.borrower.as_ref().is_some_and(|b| {
                !b.returned && b.borrowed_by == *borrowed_by && b.borrowed_at == *borrowed_at
            }),
        }
    }
}

impl Book {
    /// Build a freshly catalogued book: available, never borrowed
    pub fn new(new_book: NewBook) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new_book.title,
            author: new_book.author,
            description: new_book.description,
            available: true,
            borrower: None,
            created_at: Utc::now(),
        }
    }

    /// Whether a member currently holds the book
    pub fn is_held(&self) -> bool {
        self.borrower.as_ref().is_some_and(|b| !b.returned)
    }

    pub fn lending_state(&self) -> LendingState {
        if self.available && !self.is_held() {
            LendingState::Available
        } else {
            LendingState::Borrowed
        }
    }

    /// `available` must be true exactly when no unreturned borrower exists
    pub fn is_consistent(&self) -> bool {
        self.available != self.is_held()
    }

    /// Whether `email` is the member currently holding the book
    pub fn is_held_by(&self, email: &str) -> bool {
        self.borrower
            .as_ref()
            .is_some_and(|b| !b.returned && b.borrowed_by.eq_ignore_ascii_case(email))
    }

    /// Apply a patch in place. The caller checks the availability precondition.
    pub fn apply(&mut self, patch: BookPatch) {
        match patch {
            BookPatch::Borrow {
                borrowed_by,
                borrowed_at,
            } => {
                self.available = false;
                self.borrower = Some(Borrower {
                    borrowed_by,
                    borrowed_at,
                    returned: false,
                });
            }
            BookPatch::Return { .. } => {
                self.available = true;
                if let Some(borrower) = self.borrower.as_mut() {
                    borrower.returned = true;
                }
            }
        }
    }
}

/// Flat row layout used by the PostgreSQL store
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    pub available: bool,
    pub borrowed_by: Option<String>,
    pub borrowed_at: Option<DateTime<Utc>>,
    pub returned: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let borrower = match (row.borrowed_by, row.borrowed_at) {
            (Some(borrowed_by), Some(borrowed_at)) => Some(Borrower {
                borrowed_by,
                borrowed_at,
                returned: row.returned.unwrap_or(true),
            }),
            _ => None,
        };

        Book {
            id: row.id,
            title: row.title,
            author: row.author,
            description: row.description,
            available: row.available,
            borrower,
            created_at: row.created_at,
        }
    }
}

/// Validated book data ready for insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 500, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 300, message = "Author is required"))]
    pub author: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

/// Book query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Case-insensitive match on title or author
    pub search: Option<String>,
    /// Only books with this availability
    pub available: Option<bool>,
}

impl BookQuery {
    /// Normalized search term, `None` when blank
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, book: &Book) -> bool {
        if let Some(available) = self.available {
            if book.available != available {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => {
                book.title.to_lowercase().contains(&term)
                    || book.author.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// A book currently held by a member, as listed to that member
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowedBook {
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub borrowed_at: DateTime<Utc>,
}

/// Who holds which book, for the admin borrowers view
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveBorrow {
    pub book_id: Uuid,
    pub title: String,
    pub borrowed_by: String,
    pub borrowed_at: DateTime<Utc>,
}

impl Book {
    pub fn as_borrowed_book(&self) -> Option<BorrowedBook> {
        let borrower = self.borrower.as_ref().filter(|b| !b.returned)?;
        Some(BorrowedBook {
            book_id: self.id,
            title: self.title.clone(),
            author: self.author.clone(),
            borrowed_at: borrower.borrowed_at,
        })
    }

    /// Patch closing the current borrow, `None` when nobody holds the book
    pub fn return_patch(&self) -> Option<BookPatch> {
        let borrower = self.borrower.as_ref().filter(|b| !b.returned)?;
        Some(BookPatch::Return {
            borrowed_by: borrower.borrowed_by.clone(),
            borrowed_at: borrower.borrowed_at,
        })
    }

    pub fn as_active_borrow(&self) -> Option<ActiveBorrow> {
        let borrower = self.borrower.as_ref().filter(|b| !b.returned)?;
        Some(ActiveBorrow {
            book_id: self.id,
            title: self.title.clone(),
            borrowed_by: borrower.borrowed_by.clone(),
            borrowed_at: borrower.borrowed_at,
        })
    }
}
