//! Books repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
};

const DEFAULT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// List books, optionally filtered by a title/author substring
    pub async fn search(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT * FROM books
            WHERE $1::text IS NULL
               OR title ILIKE '%' || $1 || '%'
               OR author ILIKE '%' || $1 || '%'
            ORDER BY id
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(&query.search)
        .bind(query.skip.unwrap_or(0))
        .bind(query.limit.unwrap_or(DEFAULT_LIMIT))
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    /// Check if another book already carries this ISBN
    pub async fn isbn_exists(&self, isbn: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND id != $2)")
                .bind(isbn)
                .bind(id)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// Create a new book; all copies start available
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, published_year, quantity, available)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.published_year)
        .bind(book.quantity)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a book.
    ///
    /// Runs under the book's row lock so a quantity change cannot race a
    /// concurrent borrow or return on the same book. `available` is
    /// re-derived from the new quantity and the outstanding loan count; a
    /// quantity below the outstanding count is refused.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'").execute(&mut *tx).await?;

        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        let outstanding = book.outstanding();
        let quantity = update.quantity.unwrap_or(book.quantity);
        if quantity < outstanding {
            return Err(AppError::Conflict(format!(
                "Cannot set quantity to {}: {} copies are out on loan",
                quantity, outstanding
            )));
        }

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, published_year = $4,
                quantity = $5, available = $6
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(update.title.as_ref().unwrap_or(&book.title))
        .bind(update.author.as_ref().unwrap_or(&book.author))
        .bind(update.isbn.as_ref().or(book.isbn.as_ref()))
        .bind(update.published_year.or(book.published_year))
        .bind(quantity)
        .bind(quantity - outstanding)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book.
    ///
    /// Refused while any of its borrowings are still open; returned history
    /// rows are removed with the book.
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET LOCAL lock_timeout = '5s'").execute(&mut *tx).await?;

        let locked = sqlx::query_scalar::<_, i32>("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrowings WHERE book_id = $1 AND status = 'borrowed'",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if outstanding > 0 {
            return Err(AppError::Conflict(format!(
                "Cannot delete book: {} copies are out on loan",
                outstanding
            )));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
