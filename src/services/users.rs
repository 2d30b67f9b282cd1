//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult},
    models::user::{CreateUser, UpdateUser, User, UserClaims, UserQuery, UserRole},
    policy::{self, Action},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password, returning a JWT token and the
    /// user
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::Authentication("Incorrect username or password".to_string())
            })?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Incorrect username or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(AppError::Authorization("User is deactivated".to_string()));
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    /// Register a new user account
    pub async fn register(&self, user: CreateUser) -> AppResult<User> {
        user.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.users.username_exists(&user.username).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let hashed = self.hash_password(&user.password)?;
        self.repository.users.create(&user, &hashed).await
    }

    /// Resolve the account behind a set of claims, rejecting tokens whose
    /// account has since been removed or deactivated
    pub async fn resolve_active(&self, user_id: i32) -> AppResult<User> {
        let user = match self.repository.users.get_by_id(user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("User not found".to_string()));
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AppError::Authorization("User is deactivated".to_string()));
        }
        Ok(user)
    }

    /// Get user by ID (admin visibility)
    pub async fn get_user(&self, actor: &UserClaims, id: i32) -> AppResult<User> {
        policy::require(actor, Action::ManageUsers)?;
        self.repository.users.get_by_id(id).await
    }

    /// List users (admin visibility)
    pub async fn list_users(&self, actor: &UserClaims, query: &UserQuery) -> AppResult<Vec<User>> {
        policy::require(actor, Action::ManageUsers)?;
        self.repository.users.list(query).await
    }

    /// Update a user account
    pub async fn update_user(
        &self,
        actor: &UserClaims,
        id: i32,
        update: UpdateUser,
    ) -> AppResult<User> {
        policy::require(actor, Action::ManageUsers)?;
        update
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(ref email) = update.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already exists".to_string()));
            }
        }

        let hashed = match update.password.as_deref() {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository
            .users
            .update(id, &update, hashed.as_deref())
            .await
    }

    /// Delete a user account.
    ///
    /// Refused while the user still has open borrowings so the ledger stays
    /// linkable.
    pub async fn delete_user(&self, actor: &UserClaims, id: i32) -> AppResult<()> {
        policy::require(actor, Action::ManageUsers)?;

        if self.repository.borrowings.user_has_open(id).await? {
            return Err(AppError::Conflict(
                "Cannot delete user with open borrowings".to_string(),
            ));
        }
        self.repository.users.delete(id).await
    }

    /// Create the bootstrap administrator account if it does not exist yet
    pub async fn ensure_admin_account(&self, admin: &AdminConfig) -> AppResult<()> {
        if self.repository.users.username_exists(&admin.username).await? {
            return Ok(());
        }

        let hashed = self.hash_password(&admin.password)?;
        let account = CreateUser {
            username: admin.username.clone(),
            email: admin.email.clone(),
            full_name: Some("System Administrator".to_string()),
            password: admin.password.clone(),
            role: UserRole::Admin,
        };
        let created = self.repository.users.create(&account, &hashed).await?;
        tracing::info!(username = %created.username, "created bootstrap admin account");
        Ok(())
    }

    /// Create a JWT token for a user
    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Hash a password with argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Verify a password against the stored argon2 hash
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed = PasswordHash::new(&user.hashed_password)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}
