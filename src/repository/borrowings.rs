//! Borrowings repository for database operations
//!
//! The write paths here are the transactional units that keep a book's
//! `available` counter and its borrowing rows consistent: each one takes the
//! book's row lock before touching either table, so for a given book all
//! borrows, returns and quantity edits are linearized.

use chrono::NaiveDate;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingQuery, BorrowingStatus, BorrowingWithDetails},
    models::book::Book,
};

const DEFAULT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))
    }

    /// List borrowings with book and borrower details.
    ///
    /// `user_id = None` lists the whole ledger (admin visibility).
    pub async fn list(
        &self,
        user_id: Option<i32>,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<BorrowingWithDetails>> {
        let borrowings = sqlx::query_as::<_, BorrowingWithDetails>(
            r#"
            SELECT b.*,
                   bk.title AS book_title,
                   bk.author AS book_author,
                   bk.isbn AS book_isbn,
                   u.username AS user_username
            FROM borrowings b
            JOIN books bk ON b.book_id = bk.id
            JOIN users u ON b.user_id = u.id
            WHERE ($1::integer IS NULL OR b.user_id = $1)
              AND ($2::text IS NULL OR b.status = $2)
            ORDER BY b.created_at DESC, b.id DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.skip.unwrap_or(0))
        .bind(query.limit.unwrap_or(DEFAULT_LIMIT))
        .fetch_all(&self.pool)
        .await?;

        Ok(borrowings)
    }

    /// Check whether a user still has open borrowings
    pub async fn user_has_open(&self, user_id: i32) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM borrowings WHERE user_id = $1 AND status = 'borrowed')",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Borrow a book: decrement its availability and open a borrowing as one
    /// atomic unit.
    ///
    /// The availability check and the decrement happen under the book's row
    /// lock; when several requests race for the last copy, exactly one
    /// commits and the rest observe `available = 0`.
    pub async fn borrow(
        &self,
        user_id: i32,
        book_id: i32,
        borrow_date: NaiveDate,
    ) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'").execute(&mut *tx).await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book_id)))?;

        if book.available <= 0 {
            return Err(AppError::Conflict(format!(
                "No copies of \"{}\" are available",
                book.title
            )));
        }

        sqlx::query("UPDATE books SET available = available - 1 WHERE id = $1")
            .bind(book_id)
            .execute(&mut *tx)
            .await?;

        let borrowing = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (user_id, book_id, borrow_date, status)
            VALUES ($1, $2, $3, 'borrowed')
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(book_id)
        .bind(borrow_date)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(borrowing)
    }

    /// Return a borrowing: flip its status and restore the book's
    /// availability as one atomic unit.
    pub async fn return_borrowing(&self, id: i32, return_date: NaiveDate) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'").execute(&mut *tx).await?;

        // book_id is immutable, so an unlocked read suffices to find the
        // row to lock
        let found = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(found.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("Book {} missing for borrowing {}", found.book_id, id))
            })?;

        // Re-read under the lock: a racing return must take the same book
        // row lock before it can flip the status.
        let borrowing = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if borrowing.status == BorrowingStatus::Returned {
            return Err(AppError::Conflict(
                "Borrowing has already been returned".to_string(),
            ));
        }

        if book.available + 1 > book.quantity {
            // The counter no longer matches the open-loan count. Clamp
            // instead of exceeding quantity and leave a trace for the
            // operator; the caller still gets a normal return.
            tracing::error!(
                book_id = book.id,
                available = book.available,
                quantity = book.quantity,
                "availability would exceed quantity on return; clamping"
            );
        }

        sqlx::query("UPDATE books SET available = LEAST(available + 1, quantity) WHERE id = $1")
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

        let updated = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings
            SET status = 'returned', return_date = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(return_date)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a borrowing record.
    ///
    /// Deleting an open borrowing hands its copy back to the pool in the
    /// same transaction.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'").execute(&mut *tx).await?;

        let found = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing with id {} not found", id)))?;

        sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(found.book_id)
            .fetch_optional(&mut *tx)
            .await?;

        // Same re-read rule as return_borrowing
        let borrowing = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;

        if borrowing.status == BorrowingStatus::Borrowed {
            sqlx::query("UPDATE books SET available = LEAST(available + 1, quantity) WHERE id = $1")
                .bind(borrowing.book_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
