//! Users repository for database operations

use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserQuery},
};

const DEFAULT_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct UsersRepository {
    pool: Pool<Postgres>,
}

impl UsersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Check if username already exists
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Check if email already exists
    pub async fn email_exists(&self, email: &str, exclude_id: Option<i32>) -> AppResult<bool> {
        let exists: bool = if let Some(id) = exclude_id {
            sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND id != $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?
        };
        Ok(exists)
    }

    /// List users
    pub async fn list(&self, query: &UserQuery) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY id OFFSET $1 LIMIT $2",
        )
        .bind(query.skip.unwrap_or(0))
        .bind(query.limit.unwrap_or(DEFAULT_LIMIT))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// Create a new user with an already-hashed password
    pub async fn create(&self, user: &CreateUser, hashed_password: &str) -> AppResult<User> {
        let created = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, full_name, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(hashed_password)
        .bind(user.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    /// Update a user; absent fields are left unchanged
    pub async fn update(
        &self,
        id: i32,
        update: &UpdateUser,
        hashed_password: Option<&str>,
    ) -> AppResult<User> {
        let current = self.get_by_id(id).await?;

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $1, full_name = $2, hashed_password = $3, is_active = $4
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(update.email.as_ref().unwrap_or(&current.email))
        .bind(update.full_name.as_ref().or(current.full_name.as_ref()))
        .bind(hashed_password.unwrap_or(&current.hashed_password))
        .bind(update.is_active.unwrap_or(current.is_active))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete a user
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        Ok(())
    }
}
