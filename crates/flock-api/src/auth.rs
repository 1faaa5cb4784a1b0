use std::path::PathBuf;
use std::sync::Arc;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::Json;
use axum::extract::State;
use uuid::Uuid;

use flock_db::Database;
use flock_types::api::{LoginRequest, LoginResponse, RegisterRequest, TokenResponse};

use crate::error::{ApiError, FieldError};
use crate::{token, validate};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let mut errors = Vec::new();
    if req.username.trim().is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    }
    if !validate::looks_like_email(&req.email) {
        errors.push(FieldError::new("email", "Please include a valid email"));
    }
    if !validate::looks_like_phone(&req.phone) {
        errors.push(FieldError::new("phone", "Please include a valid phone number"));
    }
    if req.name.trim().is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    }
    if req.password.len() < 6 {
        errors.push(FieldError::new(
            "password",
            "Password must be at least 6 characters",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    if state
        .db
        .get_user_by_email(&req.email)
        .map_err(ApiError::Internal)?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists"));
    }

    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hashing failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &req.email,
        &req.phone,
        &req.name,
        &password_hash,
    )?;

    let token = token::issue(&state.jwt_secret, user_id).map_err(ApiError::Internal)?;

    Ok(Json(TokenResponse { token }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)
        .map_err(ApiError::Internal)?
        .ok_or(ApiError::InvalidCredentials)?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let user_id = crate::parse_uuid(&user.id);
    let token = token::issue(&state.jwt_secret, user_id).map_err(ApiError::Internal)?;

    Ok(Json(LoginResponse {
        token,
        message: "Login successful".into(),
    }))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Arc::new(Database::open_in_memory().unwrap()),
            jwt_secret: "test-secret".into(),
            upload_dir: std::env::temp_dir().join("flock-test-uploads"),
        })
    }

    pub fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            phone: "5551234567".into(),
            name: username.to_uppercase(),
            password: password.into(),
        }
    }

    /// Register a user and return their id.
    pub async fn register_user(state: &AppState, username: &str, email: &str) -> Uuid {
        let token = register(
            State(state.clone()),
            Json(register_request(username, email, "secret1")),
        )
        .await
        .unwrap()
        .0
        .token;
        crate::token::verify(&state.jwt_secret, &token).unwrap().sub
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{register_request, test_state};
    use super::*;

    #[tokio::test]
    async fn register_returns_a_usable_token() {
        let state = test_state();

        let response = register(
            State(state.clone()),
            Json(register_request("alice", "alice@x.com", "secret1")),
        )
        .await
        .unwrap();

        let claims = token::verify(&state.jwt_secret, &response.0.token).unwrap();
        let stored = state.db.get_user_by_email("alice@x.com").unwrap().unwrap();
        assert_eq!(claims.sub.to_string(), stored.id);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = test_state();

        register(
            State(state.clone()),
            Json(register_request("alice", "alice@x.com", "secret1")),
        )
        .await
        .unwrap();

        let err = register(
            State(state.clone()),
            Json(register_request("alice2", "alice@x.com", "secret1")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Conflict("User already exists")));
    }

    #[tokio::test]
    async fn register_rejects_bad_fields() {
        let state = test_state();

        let err = register(
            State(state),
            Json(RegisterRequest {
                username: "".into(),
                email: "nope".into(),
                phone: "123".into(),
                name: "".into(),
                password: "short".into(),
            }),
        )
        .await
        .unwrap_err();

        let ApiError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 5);
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let state = test_state();

        register(
            State(state.clone()),
            Json(register_request("alice", "alice@x.com", "secret1")),
        )
        .await
        .unwrap();

        let err = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "alice@x.com".into(),
                password: "wrong".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));

        let ok = login(
            State(state),
            Json(LoginRequest {
                email: "alice@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(ok.0.message, "Login successful");
    }

    #[tokio::test]
    async fn login_with_unknown_email_fails() {
        let state = test_state();
        let err = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@x.com".into(),
                password: "secret1".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidCredentials));
    }
}
