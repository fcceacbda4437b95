//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, login, logout and the profile.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use pdf_chat_core::{
    domain::{Account, AccountUpdate, NewAccount},
    ports::PortError,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, LazyLock};
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ErrorBody};
use crate::web::extract::ApiJson;
use crate::web::models::{
    AuthResponse, DataResponse, MessageResponse, ProfileResponse, ProfileUpdatedResponse,
    UserResponse,
};
use crate::web::state::AppState;

pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const DUPLICATE_ACCOUNT: &str = "User with this email or username already exists";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

//=========================================================================================
// Request Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

//=========================================================================================
// Helpers
//=========================================================================================

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, stored_hash: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn auth_response(state: &AppState, account: &Account) -> Result<AuthResponse, ApiError> {
    Ok(AuthResponse {
        success: true,
        token: state.credentials.issue(account.id)?,
        user: account.into(),
    })
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (
            status = 400,
            description = "Missing fields, invalid email, short password or duplicate account",
            body = ErrorBody
        ),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim();
    let email = req.email.trim();

    // 1. Validate input
    if username.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide username, email and password".to_string(),
        ));
    }
    if !is_valid_email(email) {
        return Err(ApiError::Validation("Please provide a valid email".to_string()));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    // 2. Reject collisions before writing anything
    if state.db.username_taken(username, None).await? || state.db.email_taken(email, None).await? {
        return Err(ApiError::Validation(DUPLICATE_ACCOUNT.to_string()));
    }

    // 3. Hash the password and create the account
    let password_hash = hash_password(&req.password)?;
    let account = state
        .db
        .create_account(NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await
        .map_err(|e| match e {
            // A concurrent registration won the unique index.
            PortError::Conflict(_) => ApiError::Validation(DUPLICATE_ACCOUNT.to_string()),
            other => other.into(),
        })?;
    info!(account_id = %account.id, "Account registered");

    Ok((StatusCode::CREATED, Json(auth_response(&state, &account)?)))
}

/// POST /api/auth/login - Exchange email and password for a credential
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Missing fields", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim();
    if email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Please provide email and password".to_string(),
        ));
    }

    // 1. Look up the account; an unknown email reads the same as a wrong password
    let credentials = match state.db.get_credentials_by_email(email).await {
        Ok(credentials) => credentials,
        Err(PortError::NotFound(_)) => {
            warn!("Login attempt for unknown email");
            return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    // 2. Verify the password
    if !password_matches(&req.password, &credentials.password_hash)? {
        warn!(account_id = %credentials.account.id, "Login attempt with wrong password");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    info!(account_id = %credentials.account.id, "Account logged in");
    Ok(Json(auth_response(&state, &credentials.account)?))
}

/// POST /api/auth/logout - Credentials are stateless; the client discards its token
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    params(("Authorization" = String, Header, description = "Credential issued at login")),
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn logout_handler(Extension(account): Extension<Account>) -> impl IntoResponse {
    info!(account_id = %account.id, "Account logged out");
    Json(MessageResponse::new("Logged out successfully"))
}

/// GET /api/auth/profile - The caller's account with its document count
#[utoipa::path(
    get,
    path = "/api/auth/profile",
    params(("Authorization" = String, Header, description = "Credential issued at login")),
    responses(
        (status = 200, description = "Profile", body = DataResponse<ProfileResponse>),
        (status = 401, description = "Missing or invalid credential", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
) -> Result<impl IntoResponse, ApiError> {
    let pdf_count = state.db.count_documents_for_owner(account.id).await?;
    Ok(Json(DataResponse::new(ProfileResponse {
        id: account.id,
        username: account.username,
        email: account.email,
        created_at: account.created_at,
        pdf_count,
    })))
}

/// PUT /api/auth/profile - Change username, email or password
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    params(("Authorization" = String, Header, description = "Credential issued at login")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileUpdatedResponse),
        (
            status = 400,
            description = "Invalid or conflicting values, or nothing to change",
            body = ErrorBody
        ),
        (
            status = 401,
            description = "Missing credential or wrong current password",
            body = ErrorBody
        )
    ),
    tag = "Auth"
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<Account>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let credentials = state.db.get_credentials_by_id(account.id).await?;
    let mut update = AccountUpdate {
        id: account.id,
        username: account.username.clone(),
        email: account.email.clone(),
        password_hash: credentials.password_hash.clone(),
    };
    let mut changed = false;

    // 1. Username
    if let Some(username) = req.username.as_deref().map(str::trim) {
        if !username.is_empty() && username != account.username {
            if state.db.username_taken(username, Some(account.id)).await? {
                return Err(ApiError::Validation("Username already taken".to_string()));
            }
            update.username = username.to_string();
            changed = true;
        }
    }

    // 2. Email
    if let Some(email) = req.email.as_deref().map(str::trim) {
        if !email.is_empty() && email != account.email {
            if !is_valid_email(email) {
                return Err(ApiError::Validation("Please provide a valid email".to_string()));
            }
            if state.db.email_taken(email, Some(account.id)).await? {
                return Err(ApiError::Validation("Email already in use".to_string()));
            }
            update.email = email.to_string();
            changed = true;
        }
    }

    // 3. Password
    if let Some(new_password) = req.new_password.as_deref().filter(|p| !p.is_empty()) {
        let current = req.current_password.as_deref().unwrap_or_default();
        if current.is_empty() {
            return Err(ApiError::Validation(
                "Current password is required to set a new password".to_string(),
            ));
        }
        if !password_matches(current, &credentials.password_hash)? {
            return Err(ApiError::Unauthenticated(
                "Current password is incorrect".to_string(),
            ));
        }
        if new_password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::Validation(
                "New password must be at least 6 characters long".to_string(),
            ));
        }
        update.password_hash = hash_password(new_password)?;
        changed = true;
    }

    if !changed {
        return Err(ApiError::Validation("No changes to update".to_string()));
    }

    let updated = state.db.update_account(update).await?;
    info!(account_id = %updated.id, "Profile updated");
    Ok(Json(ProfileUpdatedResponse {
        success: true,
        message: "Profile updated successfully".to_string(),
        data: UserResponse::from(&updated),
    }))
}
