//! User service: sign-up, sign-in and token handling.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use friendful_common::{AppError, AppResult, IdGenerator};
use friendful_db::{entities::user, repositories::UserRepository};
use rand::seq::SliceRandom;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

/// Background colours for generated avatars.
pub const AVATAR_COLORS: [&str; 7] = [
    "#3498db", "#2ecc71", "#f39c12", "#9b59b6", "#1abc9c", "#16a085", "#2980b9",
];

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
}

/// Input for signing up.
#[derive(Debug, Deserialize, Validate)]
pub struct SignUpInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(email, length(max = 100))]
    pub email: String,

    #[validate(length(min = 8, max = 100))]
    pub password: String,
}

/// Input for signing in.
#[derive(Debug, Deserialize, Validate)]
pub struct SignInInput {
    #[validate(length(min = 1, max = 100))]
    pub email: String,

    #[validate(length(min = 1, max = 100))]
    pub password: String,
}

/// Credentials handed back after sign-up or sign-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: String,
    pub token: String,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self {
            user_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user.
    pub async fn sign_up(&self, input: SignUpInput) -> AppResult<AuthSession> {
        input.validate()?;

        let email = input.email.trim().to_lowercase();
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let user_id = self.id_gen.generate();
        let token = self.id_gen.generate_token();

        let model = user::ActiveModel {
            id: Set(user_id.clone()),
            name: Set(input.name.trim().to_string()),
            email: Set(email),
            password: Set(password_hash),
            token: Set(Some(token.clone())),
            image: Set(None),
            avatar_background_color: Set(random_avatar_color().to_string()),
            created_at: Set(Utc::now().into()),
        };

        self.user_repo.create(model).await?;
        info!(user_id = %user_id, "User signed up");

        Ok(AuthSession { user_id, token })
    }

    /// Authenticate with email and password.
    pub async fn sign_in(&self, input: SignInInput) -> AppResult<AuthSession> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(input.email.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        let token = match user.token {
            Some(token) => token,
            None => {
                let token = self.id_gen.generate_token();
                self.user_repo.update_token(&user.id, &token).await?;
                token
            }
        };

        info!(user_id = %user.id, "User signed in");
        Ok(AuthSession {
            user_id: user.id,
            token,
        })
    }

    /// Invalidate the user's current token by issuing a new one.
    pub async fn sign_out(&self, user_id: &str) -> AppResult<()> {
        let token = self.id_gen.generate_token();
        self.user_repo.update_token(user_id, &token).await?;
        info!(user_id = %user_id, "User signed out");
        Ok(())
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}

fn random_avatar_color() -> &'static str {
    AVATAR_COLORS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(AVATAR_COLORS[0])
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, email: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password: hash_password(password).unwrap(),
            token: Some("test_token".to_string()),
            image: None,
            avatar_background_color: AVATAR_COLORS[0].to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn create_test_service(db: MockDatabase) -> UserService {
        UserService::new(UserRepository::new(Arc::new(db.into_connection())))
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("test", "invalid_hash").is_err());
    }

    #[test]
    fn test_random_avatar_color_from_palette() {
        for _ in 0..20 {
            assert!(AVATAR_COLORS.contains(&random_avatar_color()));
        }
    }

    #[tokio::test]
    async fn test_sign_up_validation() {
        let service = create_test_service(MockDatabase::new(DatabaseBackend::Postgres));

        let short_password = SignUpInput {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(matches!(
            service.sign_up(short_password).await,
            Err(AppError::Validation(_))
        ));

        let bad_email = SignUpInput {
            name: "Ada".to_string(),
            email: "not-an-email".to_string(),
            password: "long enough".to_string(),
        };
        assert!(matches!(
            service.sign_up(bad_email).await,
            Err(AppError::Validation(_))
        ));

        let long_name = SignUpInput {
            name: "a".repeat(101),
            email: "ada@example.com".to_string(),
            password: "long enough".to_string(),
        };
        assert!(matches!(
            service.sign_up(long_name).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let existing = create_test_user("user1", "ada@example.com", "password123");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let input = SignUpInput {
            name: "Ada".to_string(),
            email: "Ada@Example.com".to_string(),
            password: "password123".to_string(),
        };

        match service.sign_up(input).await {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "Email already exists"),
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sign_in_returns_existing_token() {
        let existing = create_test_user("user1", "ada@example.com", "password123");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let session = service
            .sign_in(SignInInput {
                email: "ada@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.user_id, "user1");
        assert_eq!(session.token, "test_token");
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let existing = create_test_user("user1", "ada@example.com", "password123");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service
            .sign_in(SignInInput {
                email: "ada@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service.authenticate_by_token("nope").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
