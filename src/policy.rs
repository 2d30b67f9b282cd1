//! Access policy: role-based authorization decisions
//!
//! Every mutating operation passes through [`authorize`] before touching the
//! stores. The decision depends only on the actor's claims and the requested
//! action, never on client-side state.

use crate::error::{AppError, AppResult};
use crate::models::user::UserClaims;

/// An action an authenticated actor may request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateBook,
    UpdateBook,
    DeleteBook,
    /// Create a borrowing on the actor's own behalf
    Borrow,
    /// Return the borrowing owned by `owner_id`
    ReturnBorrowing { owner_id: i32 },
    /// Read the borrowing owned by `owner_id`
    ReadBorrowing { owner_id: i32 },
    /// See every borrowing regardless of owner
    ListAllBorrowings,
    DeleteBorrowing,
    ManageUsers,
}

/// Outcome of a policy check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

/// Decide whether `actor` may perform `action`.
///
/// Catalog and book-detail reads are open to unauthenticated visitors and
/// never reach this function.
pub fn authorize(actor: &UserClaims, action: Action) -> Decision {
    match action {
        Action::CreateBook | Action::UpdateBook | Action::DeleteBook => {
            if actor.is_admin() {
                Decision::Allow
            } else {
                Decision::Deny("Insufficient permissions. Admin role required.")
            }
        }
        // Any authenticated user may borrow, admins included; the client
        // hiding the borrow button for admins is cosmetic.
        Action::Borrow => Decision::Allow,
        Action::ReturnBorrowing { owner_id } | Action::ReadBorrowing { owner_id } => {
            if actor.is_admin() || actor.user_id == owner_id {
                Decision::Allow
            } else {
                Decision::Deny("Access forbidden")
            }
        }
        Action::ListAllBorrowings | Action::DeleteBorrowing | Action::ManageUsers => {
            if actor.is_admin() {
                Decision::Allow
            } else {
                Decision::Deny("Insufficient permissions. Admin role required.")
            }
        }
    }
}

/// [`authorize`] with denial mapped onto [`AppError::Authorization`]
pub fn require(actor: &UserClaims, action: Action) -> AppResult<()> {
    match authorize(actor, action) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(AppError::Authorization(reason.to_string())),
    }
}
