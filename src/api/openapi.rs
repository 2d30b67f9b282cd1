//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, borrowings, health, users};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Libris API",
        version = "1.0.0",
        description = "Library Management System REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html"),
        contact(name = "Libris Team", email = "contact@libris.org")
    ),
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Borrowings
        borrowings::create_borrowing,
        borrowings::list_borrowings,
        borrowings::my_borrowings,
        borrowings::get_borrowing,
        borrowings::update_borrowing,
        borrowings::delete_borrowing,
        // Users
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            // Books
            crate::models::book::Book,
            crate::models::book::CreateBook,
            crate::models::book::UpdateBook,
            crate::models::book::BookQuery,
            // Borrowings
            crate::models::borrowing::Borrowing,
            crate::models::borrowing::BorrowingWithDetails,
            crate::models::borrowing::BorrowingStatus,
            crate::models::borrowing::CreateBorrowing,
            crate::models::borrowing::UpdateBorrowing,
            crate::models::borrowing::BorrowingQuery,
            // Users
            crate::models::user::User,
            crate::models::user::UserRole,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::UserQuery,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration and login"),
        (name = "books", description = "Book catalog management"),
        (name = "borrowings", description = "Borrow and return books"),
        (name = "users", description = "User management")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
