//! Book (catalog) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Book model from database
///
/// `available` counts the copies not currently on loan and always satisfies
/// `0 <= available <= quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub published_year: Option<i32>,
    pub quantity: i32,
    pub available: i32,
    pub created_at: DateTime<Utc>,
}

impl Book {
    /// Copies currently on loan
    pub fn outstanding(&self) -> i32 {
        self.quantity - self.available
    }
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1-100 characters"))]
    pub author: String,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Published year must be 1000-2100"))]
    pub published_year: Option<i32>,
    /// Total copies owned; new books start fully available
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Update book request; absent fields are left unchanged.
///
/// `available` is never accepted from the caller: it is re-derived from the
/// new quantity and the outstanding loan count.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Author must be 1-100 characters"))]
    pub author: Option<String>,
    #[validate(length(max = 20, message = "ISBN must be at most 20 characters"))]
    pub isbn: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Published year must be 1000-2100"))]
    pub published_year: Option<i32>,
    #[validate(range(min = 0, message = "Quantity must be non-negative"))]
    pub quantity: Option<i32>,
}

/// Book query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Substring match against title or author, case-insensitive
    pub search: Option<String>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}
