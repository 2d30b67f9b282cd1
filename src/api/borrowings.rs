//! Borrowing endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::borrowing::{
        Borrowing, BorrowingQuery, BorrowingWithDetails, CreateBorrowing, UpdateBorrowing,
    },
};

use super::AuthenticatedUser;

/// Borrow a book
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created", body = Borrowing),
        (status = 401, description = "Not authenticated"),
        (status = 404, description = "Book not found"),
        (status = 409, description = "No copies available")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    let borrowing = state.services.circulation.borrow(&claims, request).await?;
    Ok((StatusCode::CREATED, Json(borrowing)))
}

/// List borrowings: admins see all, other users see only their own
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "List of borrowings", body = Vec<BorrowingWithDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingWithDetails>>> {
    let borrowings = state.services.circulation.list(&claims, &query).await?;
    Ok(Json(borrowings))
}

/// List the current user's borrowings
#[utoipa::path(
    get,
    path = "/borrowings/my",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowingQuery),
    responses(
        (status = 200, description = "Current user's borrowings", body = Vec<BorrowingWithDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowingQuery>,
) -> AppResult<Json<Vec<BorrowingWithDetails>>> {
    let borrowings = state.services.circulation.list_mine(&claims, &query).await?;
    Ok(Json(borrowings))
}

/// Get a borrowing by ID
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing details", body = Borrowing),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state.services.circulation.get(&claims, id).await?;
    Ok(Json(borrowing))
}

/// Update a borrowing (return a book)
#[utoipa::path(
    put,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    request_body = UpdateBorrowing,
    responses(
        (status = 200, description = "Borrowing updated", body = Borrowing),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Borrowing not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn update_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(request): Json<UpdateBorrowing>,
) -> AppResult<Json<Borrowing>> {
    let borrowing = state
        .services
        .circulation
        .update(&claims, id, request)
        .await?;
    Ok(Json(borrowing))
}

/// Delete a borrowing record (admin only)
#[utoipa::path(
    delete,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 204, description = "Borrowing deleted"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Admin role required"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn delete_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.circulation.delete(&claims, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
