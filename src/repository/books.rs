//! Books repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use super::{CatalogStore, LendingSnapshot, UpdateOutcome};
use crate::{
    error::AppResult,
    models::book::{Book, BookPatch, BookQuery, BookRow, NewBook},
};

const BOOK_COLUMNS: &str =
    "id, title, author, description, available, borrowed_by, borrowed_at, returned, created_at";

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: Pool<Postgres>,
}

impl PgCatalogStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn read_book(&self, id: Uuid) -> AppResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE id = $1",
            BOOK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Book::from))
    }

    async fn lending_snapshot(&self, book_id: Uuid, actor_email: &str) -> AppResult<Option<LendingSnapshot>> {
        // One statement, one snapshot: the book and the count are read together
        let row = sqlx::query(&format!(
            r#"
            SELECT {},
                   (SELECT COUNT(*) FROM books b2
                    WHERE lower(b2.borrowed_by) = lower($2) AND b2.returned = FALSE) AS active_borrows
            FROM books
            WHERE id = $1
            "#,
            BOOK_COLUMNS
        ))
        .bind(book_id)
        .bind(actor_email)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let active_borrows: i64 = row.try_get("active_borrows")?;
        let book = BookRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            author: row.try_get("author")?,
            description: row.try_get("description")?,
            available: row.try_get("available")?,
            borrowed_by: row.try_get("borrowed_by")?,
            borrowed_at: row.try_get("borrowed_at")?,
            returned: row.try_get("returned")?,
            created_at: row.try_get("created_at")?,
        };

        Ok(Some(LendingSnapshot {
            book: book.into(),
            active_borrows,
        }))
    }

    async fn conditional_update_book(
        &self,
        id: Uuid,
        expected_available: bool,
        patch: BookPatch,
    ) -> AppResult<UpdateOutcome> {
        let row = match patch {
            BookPatch::Borrow {
                borrowed_by,
                borrowed_at,
            } => {
                sqlx::query_as::<_, BookRow>(&format!(
                    r#"
                    UPDATE books
                    SET available = FALSE, borrowed_by = $3, borrowed_at = $4, returned = FALSE
                    WHERE id = $1 AND available = $2
                    RETURNING {}
                    "#,
                    BOOK_COLUMNS
                ))
                .bind(id)
                .bind(expected_available)
                .bind(borrowed_by)
                .bind(borrowed_at)
                .fetch_optional(&self.pool)
                .await?
            }
            BookPatch::Return {
                borrowed_by,
                borrowed_at,
            } => {
                sqlx::query_as::<_, BookRow>(&format!(
                    r#"
                    UPDATE books
                    SET available = TRUE, returned = TRUE
                    WHERE id = $1 AND available = $2
                      AND borrowed_by = $3 AND borrowed_at = $4 AND returned = FALSE
                    RETURNING {}
                    "#,
                    BOOK_COLUMNS
                ))
                .bind(id)
                .bind(expected_available)
                .bind(borrowed_by)
                .bind(borrowed_at)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(match row {
            Some(row) => UpdateOutcome::Applied(row.into()),
            None => UpdateOutcome::PreconditionFailed,
        })
    }

    async fn count_active_borrows(&self, actor_email: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM books WHERE lower(borrowed_by) = lower($1) AND returned = FALSE",
        )
        .bind(actor_email)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_book(&self, book: NewBook) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            INSERT INTO books (id, title, author, description, available, created_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING {}
            "#,
            BOOK_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_books(&self, query: BookQuery) -> AppResult<Vec<Book>> {
        let pattern = query
            .search_term()
            .map(|term| format!("%{}%", escape_like(&term)));

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE ($1::TEXT IS NULL
                   OR lower(title) LIKE $1 ESCAPE '\'
                   OR lower(author) LIKE $1 ESCAPE '\')
              AND ($2::BOOLEAN IS NULL OR available = $2)
            ORDER BY title, id
            "#,
            BOOK_COLUMNS
        ))
        .bind(pattern)
        .bind(query.available)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn active_borrows_for(&self, actor_email: &str) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            r#"
            SELECT {}
            FROM books
            WHERE lower(borrowed_by) = lower($1) AND returned = FALSE
            ORDER BY borrowed_at
            "#,
            BOOK_COLUMNS
        ))
        .bind(actor_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }

    async fn all_active_borrows(&self) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {} FROM books WHERE returned = FALSE ORDER BY borrowed_at",
            BOOK_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Book::from).collect())
    }
}

/// Escape `LIKE` wildcards so the term matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
