//! Circulation service: borrowing and returning books
//!
//! Fronts the transactional units in the borrowings repository with policy
//! checks and ownership scoping.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{
        Borrowing, BorrowingQuery, BorrowingStatus, BorrowingWithDetails, CreateBorrowing,
        UpdateBorrowing,
    },
    models::user::UserClaims,
    policy::{self, Action, Decision},
    repository::Repository,
};

#[derive(Clone)]
pub struct CirculationService {
    repository: Repository,
}

impl CirculationService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Borrow a book on the actor's own behalf
    pub async fn borrow(
        &self,
        actor: &UserClaims,
        request: CreateBorrowing,
    ) -> AppResult<Borrowing> {
        policy::require(actor, Action::Borrow)?;
        self.repository
            .borrowings
            .borrow(actor.user_id, request.book_id, request.borrow_date)
            .await
    }

    /// List borrowings: admins see the whole ledger, everyone else their own
    pub async fn list(
        &self,
        actor: &UserClaims,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<BorrowingWithDetails>> {
        let scope = match policy::authorize(actor, Action::ListAllBorrowings) {
            Decision::Allow => None,
            Decision::Deny(_) => Some(actor.user_id),
        };
        self.repository.borrowings.list(scope, query).await
    }

    /// List the actor's own borrowings
    pub async fn list_mine(
        &self,
        actor: &UserClaims,
        query: &BorrowingQuery,
    ) -> AppResult<Vec<BorrowingWithDetails>> {
        self.repository
            .borrowings
            .list(Some(actor.user_id), query)
            .await
    }

    /// Get a single borrowing, visible to its owner and to admins
    pub async fn get(&self, actor: &UserClaims, id: i32) -> AppResult<Borrowing> {
        let borrowing = self.repository.borrowings.get_by_id(id).await?;
        policy::require(actor, Action::ReadBorrowing { owner_id: borrowing.user_id })?;
        Ok(borrowing)
    }

    /// Update a borrowing. The only supported transition is the return:
    /// `status = returned`, which restores the book's availability.
    pub async fn update(
        &self,
        actor: &UserClaims,
        id: i32,
        update: UpdateBorrowing,
    ) -> AppResult<Borrowing> {
        let borrowing = self.repository.borrowings.get_by_id(id).await?;
        policy::require(actor, Action::ReturnBorrowing { owner_id: borrowing.user_id })?;

        match update.status {
            Some(BorrowingStatus::Returned) => {
                let return_date = update
                    .return_date
                    .unwrap_or_else(|| Utc::now().date_naive());
                self.repository
                    .borrowings
                    .return_borrowing(id, return_date)
                    .await
            }
            Some(BorrowingStatus::Borrowed) => Err(AppError::Conflict(
                "Borrowing status cannot move back to borrowed".to_string(),
            )),
            None => Err(AppError::Validation(
                "status is required; send status = \"returned\" to return a book".to_string(),
            )),
        }
    }

    /// Delete a borrowing record (admin only)
    pub async fn delete(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        policy::require(actor, Action::DeleteBorrowing)?;
        self.repository.borrowings.delete(id).await
    }
}
