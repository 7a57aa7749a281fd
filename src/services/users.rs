//! Registration, login and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use super::notifications::{self, NotificationService};
use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult},
    models::{
        enums::Role,
        user::{RegisterUser, UpdateProfile, User, UserClaims, UserShort},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
    notifications: NotificationService,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig, notifications: NotificationService) -> Self {
        Self {
            repository,
            config,
            notifications,
        }
    }

    /// Create a patron account
    pub async fn register(&self, data: &RegisterUser) -> AppResult<User> {
        let hash = hash_password(&data.password)?;
        let user = self
            .repository
            .users
            .create(data.username.trim(), data.email.trim(), &hash, Role::Patron)
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "Registered new patron");
        Ok(user)
    }

    /// Create the configured librarian account if the instance has none
    pub async fn ensure_admin(&self, admin: &AdminConfig) -> AppResult<Option<User>> {
        let (Some(username), Some(email), Some(password)) = (&admin.username, &admin.email, &admin.password) else {
            return Ok(None);
        };
        if self.repository.users.count_by_role(Role::Librarian).await? > 0 {
            return Ok(None);
        }

        let hash = hash_password(password)?;
        let user = self
            .repository
            .users
            .create(username, email, &hash, Role::Librarian)
            .await?;
        tracing::info!(user_id = user.id, username = %user.username, "Created initial librarian account");
        Ok(Some(user))
    }

    /// Authenticate by username or email and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !verify_password(&user.password, password)? {
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
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

    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Update the caller's profile. Changing the password needs the current one.
    pub async fn update_profile(&self, user_id: i32, data: &UpdateProfile) -> AppResult<User> {
        let new_hash = match &data.new_password {
            Some(new_password) => {
                let current = data.current_password.as_deref().ok_or_else(|| {
                    AppError::Validation("Current password is required to set a new one".to_string())
                })?;
                let user = self.repository.users.get_by_id(user_id).await?;
                if !verify_password(&user.password, current)? {
                    return Err(AppError::Authentication("Current password is incorrect".to_string()));
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        self.repository
            .users
            .update_profile(
                user_id,
                data.username.as_deref().map(str::trim),
                data.email.as_deref().map(str::trim),
                new_hash.as_deref(),
            )
            .await
    }

    pub async fn search_patrons(&self, q: Option<&str>) -> AppResult<Vec<UserShort>> {
        self.repository.users.search_patrons(q.unwrap_or("").trim()).await
    }

    /// Promote a patron to librarian
    pub async fn promote(&self, claims: &UserClaims, user_id: i32) -> AppResult<UserShort> {
        claims.require_librarian()?;

        let target = self.repository.users.get_by_id(user_id).await?;
        if target.role == Role::Librarian {
            return Err(AppError::BusinessRule(format!(
                "{} is already a librarian",
                target.username
            )));
        }

        let promoted: UserShort = self.repository.users.set_role(user_id, Role::Librarian).await?.into();
        tracing::info!(user_id, promoted_by = claims.user_id, "Promoted patron to librarian");

        self.notifications
            .dispatch(notifications::promoted(claims.user_id, &promoted))
            .await;

        Ok(promoted)
    }
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password(&hash, "correct horse").unwrap());
        assert!(!verify_password(&hash, "wrong horse").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_internal_error() {
        assert!(matches!(verify_password("plain", "plain"), Err(AppError::Internal(_))));
    }
}
