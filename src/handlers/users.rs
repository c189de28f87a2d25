use axum::{extract::State, Json};

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{User, UserDto},
    state::AppState,
};

/// GET /users/@me — identity of the current caller.
pub async fn get_current_user(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<UserDto>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(auth.user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}
