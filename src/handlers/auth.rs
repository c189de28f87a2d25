use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    auth::{
        create_access_token, create_refresh_token, hash_password, validate_token, verify_password,
        AuthUser,
    },
    error::{AppError, AppResult},
    models::{Session, User, UserDto},
    state::AppState,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    req.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    info!("Registering new user: {}", req.username);

    let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.pool)
        .await?;

    if existing.is_some() {
        return Err(AppError::Conflict("Username already taken".into()));
    }

    if let Some(ref email) = req.email {
        let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&state.pool)
            .await?;

        if existing.is_some() {
            return Err(AppError::Conflict("Email already registered".into()));
        }
    }

    let password_hash = hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(&req.username)
    .bind(&req.email)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await?;

    info!("User created: {} ({})", user.username, user.id);

    let tokens = issue_tokens(&state, &user).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    info!("Login attempt for user: {}", req.username);

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&req.username)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid username or password".into()))?;

    let valid = verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(AppError::Auth("Invalid username or password".into()));
    }

    info!("Login successful: {} ({})", user.username, user.id);

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(tokens))
}

/// POST /auth/refresh — redeem a refresh token for a fresh token pair.
///
/// The token must both be a valid JWT and match a live row in `sessions`;
/// redeeming rotates the session, so a refresh token is single-use and a
/// revoked (logged-out) one stops working even before its JWT expiry.
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let claims = validate_token(&req.refresh_token, &state.jwt_secret)?;
    let user_id = claims.user_id()?;

    // Expired sessions are dead weight; prune them on the way through.
    sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND expires_at < NOW()")
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    let sessions = sqlx::query_as::<_, Session>(
        "SELECT * FROM sessions WHERE user_id = $1 AND expires_at > NOW()",
    )
    .bind(user_id)
    .fetch_all(&state.pool)
    .await?;

    let session = sessions
        .iter()
        .find(|s| verify_password(&req.refresh_token, &s.refresh_token_hash).unwrap_or(false))
        .ok_or_else(|| AppError::Auth("Refresh token is revoked or unknown".into()))?;

    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session.id)
        .execute(&state.pool)
        .await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::Auth("User no longer exists".into()))?;

    let tokens = issue_tokens(&state, &user).await?;
    Ok(Json(tokens))
}

/// POST /auth/logout — revoke all of the caller's refresh tokens. Access
/// tokens are short-lived and simply age out.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> AppResult<StatusCode> {
    sqlx::query("DELETE FROM sessions WHERE user_id = $1")
        .bind(auth.user_id)
        .execute(&state.pool)
        .await?;

    info!("Logged out: {}", auth.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Mint access + refresh tokens and record the refresh token hash so it can
/// be revoked server-side.
async fn issue_tokens(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let access_token = create_access_token(user.id, user.username.clone(), &state.jwt_secret)?;
    let refresh_token = create_refresh_token(user.id, user.username.clone(), &state.jwt_secret)?;

    let refresh_token_hash = hash_password(&refresh_token)?;
    sqlx::query(
        r#"
        INSERT INTO sessions (user_id, refresh_token_hash, expires_at)
        VALUES ($1, $2, NOW() + INTERVAL '7 days')
        "#,
    )
    .bind(user.id)
    .bind(&refresh_token_hash)
    .execute(&state.pool)
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.clone().into(),
    })
}
