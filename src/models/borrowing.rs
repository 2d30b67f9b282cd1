//! Borrowing (loan) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};

/// Lifecycle status of a borrowing.
///
/// The transition is monotonic: `borrowed -> returned`, exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Borrowed,
    Returned,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Borrowed => "borrowed",
            BorrowingStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "borrowed" => Ok(BorrowingStatus::Borrowed),
            "returned" => Ok(BorrowingStatus::Returned),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

// SQLx conversion for BorrowingStatus (stored as TEXT)
impl sqlx::Type<Postgres> for BorrowingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for BorrowingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for BorrowingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Borrowing model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Borrowing {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowingStatus,
    pub created_at: DateTime<Utc>,
}

/// Borrowing with book and borrower details for list views
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowingWithDetails {
    pub id: i32,
    pub user_id: i32,
    pub book_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowingStatus,
    pub created_at: DateTime<Utc>,
    pub book_title: String,
    pub book_author: String,
    pub book_isbn: Option<String>,
    pub user_username: String,
}

/// Create borrowing request (borrow a book)
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBorrowing {
    pub book_id: i32,
    pub borrow_date: NaiveDate,
}

/// Update borrowing request (return a book)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateBorrowing {
    pub return_date: Option<NaiveDate>,
    pub status: Option<BorrowingStatus>,
}

/// Borrowing query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    /// Filter by status (`borrowed` or `returned`)
    pub status: Option<BorrowingStatus>,
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}
