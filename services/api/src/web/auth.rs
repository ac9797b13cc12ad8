//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for student and administrator registration, login,
//! profile lookup and logout.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use campus_core::domain::{Caller, NewUser, Role, UserCredentials};
use campus_core::ports::{PortError, PortResult};
use campus_core::validation::{
    require_non_empty, validate_email, validate_password, validate_student_id,
    ADMIN_PASSWORD_MIN, STUDENT_PASSWORD_MIN,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ApiJson;
use crate::web::middleware::bearer_token;
use crate::web::protocol::{
    AdminLoginRequest, AdminRegisterRequest, AuthResponse, MessageResponse, StudentLoginRequest,
    StudentRegisterRequest, UserDto,
};
use crate::web::state::AppState;

//=========================================================================================
// Password and Session Helpers
//=========================================================================================

/// Hashes a password into an Argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hashed: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(hashed)
        .map_err(|e| ApiError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Issues a fresh bearer token for the user.
async fn start_session(state: &AppState, user_id: Uuid) -> PortResult<(String, DateTime<Utc>)> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + state.config.session_ttl;
    state
        .db
        .create_auth_session(&token, user_id, expires_at)
        .await?;
    Ok((token, expires_at))
}

/// Checks a looked-up account against the supplied password and expected role.
fn authenticate(
    credentials: PortResult<UserCredentials>,
    password: &str,
    role: Role,
) -> Result<UserCredentials, ApiError> {
    let credentials = match credentials {
        Ok(c) => c,
        Err(PortError::NotFound(_)) => return Err(PortError::Unauthorized.into()),
        Err(e) => return Err(e.into()),
    };
    if credentials.role != role || !verify_password(password, &credentials.hashed_password)? {
        warn!(user_id = %credentials.user_id, "Rejected login attempt");
        return Err(PortError::Unauthorized.into());
    }
    Ok(credentials)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/student/register - Create a student account and sign it in
#[utoipa::path(
    post,
    path = "/auth/student/register",
    request_body = StudentRegisterRequest,
    responses(
        (status = 201, description = "Student registered", body = AuthResponse),
        (status = 400, description = "Invalid registration", body = ErrorBody),
        (status = 409, description = "Student ID or email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_student_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<StudentRegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = require_non_empty(&req.name, "Name")?;
    let student_id = req.student_id.trim().to_string();
    validate_student_id(&student_id)?;
    let email = req.email.trim().to_string();
    validate_email(&email)?;
    validate_password(&req.password, STUDENT_PASSWORD_MIN)?;

    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            student_id: Some(student_id),
            hashed_password: hash_password(&req.password)?,
            role: Role::Student,
        })
        .await?;
    let (token, expires_at) = start_session(&state, user.id).await?;
    info!(user_id = %user.id, "Student registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            expires_at,
            user: user.into(),
        }),
    ))
}

/// POST /auth/admin/register - Create an administrator account
#[utoipa::path(
    post,
    path = "/auth/admin/register",
    request_body = AdminRegisterRequest,
    responses(
        (status = 201, description = "Administrator registered", body = UserDto),
        (status = 400, description = "Invalid registration", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn register_admin_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AdminRegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = require_non_empty(&req.name, "Name")?;
    let email = req.email.trim().to_string();
    validate_email(&email)?;
    validate_password(&req.password, ADMIN_PASSWORD_MIN)?;

    let user = state
        .db
        .create_user(NewUser {
            name,
            email,
            student_id: None,
            hashed_password: hash_password(&req.password)?,
            role: Role::Admin,
        })
        .await?;
    info!(user_id = %user.id, "Administrator registered");

    Ok((StatusCode::CREATED, Json(UserDto::from(user))))
}

/// POST /auth/student/login - Login with student ID and password
#[utoipa::path(
    post,
    path = "/auth/student/login",
    request_body = StudentLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_student_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<StudentLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let lookup = state
        .db
        .get_credentials_by_student_id(req.student_id.trim())
        .await;
    let credentials = authenticate(lookup, &req.password, Role::Student)?;
    let (token, expires_at) = start_session(&state, credentials.user_id).await?;
    let user = state.db.get_user_by_id(credentials.user_id).await?;

    Ok(Json(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

/// POST /auth/admin/login - Login with email and password
#[utoipa::path(
    post,
    path = "/auth/admin/login",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "auth"
)]
pub async fn login_admin_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AdminLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let lookup = state.db.get_credentials_by_email(req.email.trim()).await;
    let credentials = authenticate(lookup, &req.password, Role::Admin)?;
    let (token, expires_at) = start_session(&state, credentials.user_id).await?;
    let user = state.db.get_user_by_id(credentials.user_id).await?;

    Ok(Json(AuthResponse {
        token,
        expires_at,
        user: user.into(),
    }))
}

/// GET /auth/me - The profile behind the current token
#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserDto),
        (status = 401, description = "Missing or expired token", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<UserDto>, ApiError> {
    let user = state.db.get_user_by_id(caller.user_id).await?;
    Ok(Json(user.into()))
}

/// POST /auth/logout - Invalidate the current token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "No active session", body = ErrorBody)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let token = bearer_token(&headers).ok_or(PortError::Unauthorized)?;
    state.db.delete_auth_session(token).await?;
    info!(user_id = %caller.user_id, "Logged out");

    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_passwords_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn unknown_accounts_are_unauthorized() {
        let err = authenticate(
            Err(PortError::NotFound("nobody".to_string())),
            "whatever",
            Role::Student,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Port(PortError::Unauthorized)));
    }

    #[test]
    fn role_mismatch_is_unauthorized() {
        let creds = UserCredentials {
            user_id: Uuid::new_v4(),
            name: "Dean".to_string(),
            email: "dean@campus.test".to_string(),
            role: Role::Admin,
            hashed_password: hash_password("secret1").unwrap(),
        };
        let err = authenticate(Ok(creds), "secret1", Role::Student).unwrap_err();
        assert!(matches!(err, ApiError::Port(PortError::Unauthorized)));
    }
}
