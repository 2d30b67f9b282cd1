//! Catalog management service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, CreateBook, UpdateBook},
    models::user::UserClaims,
    policy::{self, Action},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with an optional title/author filter
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<Book>> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i32) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, actor: &UserClaims, book: CreateBook) -> AppResult<Book> {
        policy::require(actor, Action::CreateBook)?;
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref isbn) = book.isbn {
            if self.repository.books.isbn_exists(isbn, None).await? {
                return Err(AppError::Conflict(
                    "Book with this ISBN already exists".to_string(),
                ));
            }
        }

        self.repository.books.create(&book).await
    }

    /// Update an existing book
    pub async fn update_book(
        &self,
        actor: &UserClaims,
        id: i32,
        update: UpdateBook,
    ) -> AppResult<Book> {
        policy::require(actor, Action::UpdateBook)?;
        update
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref isbn) = update.isbn {
            if self.repository.books.isbn_exists(isbn, Some(id)).await? {
                return Err(AppError::Conflict(
                    "Book with this ISBN already exists".to_string(),
                ));
            }
        }

        self.repository.books.update(id, &update).await
    }

    /// Delete a book
    pub async fn delete_book(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        policy::require(actor, Action::DeleteBook)?;
        self.repository.books.delete(id).await
    }
}
