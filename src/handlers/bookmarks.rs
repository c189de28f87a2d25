use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Bookmark, CreateBookmarkDto, UpdateBookmarkDto},
    state::AppState,
};

// ============================================================================
// Input validation
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookmarkRequest {
    /// Must be a valid HTTP(S) URL.
    #[validate(url(message = "url must be a valid URL"))]
    pub url: String,
    #[validate(length(min = 1, max = 64, message = "category must be 1–64 characters"))]
    pub category: String,
    pub favorite: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookmarkRequest {
    #[validate(length(min = 1, max = 64, message = "category must be 1–64 characters"))]
    pub category: Option<String>,
    pub favorite: Option<bool>,
}

fn validation_error(e: validator::ValidationErrors) -> AppError {
    AppError::Validation(
        e.field_errors()
            .values()
            .flat_map(|v| v.iter())
            .filter_map(|e| e.message.as_ref())
            .map(|m| m.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    )
}

// ============================================================================
// Private helpers
// ============================================================================

/// Fetch a bookmark scoped to its owner. Someone else's bookmark reads as
/// 404, indistinguishable from a missing row.
async fn fetch_owned_bookmark(
    pool: &sqlx::PgPool,
    id: Uuid,
    owner: Uuid,
) -> AppResult<Bookmark> {
    sqlx::query_as::<_, Bookmark>(
        "SELECT id, url, category, favorite, owner, created_at
         FROM bookmarks WHERE id = $1 AND owner = $2",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Bookmark not found".into()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /bookmarks — store a URL under a category for the caller.
pub async fn create_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateBookmarkRequest>,
) -> AppResult<(StatusCode, Json<Bookmark>)> {
    req.validate().map_err(validation_error)?;

    let dto = CreateBookmarkDto {
        url: req.url,
        category: req.category,
        favorite: req.favorite,
    };

    let bookmark = sqlx::query_as::<_, Bookmark>(
        "INSERT INTO bookmarks (url, category, favorite, owner)
         VALUES ($1, $2, $3, $4)
         RETURNING id, url, category, favorite, owner, created_at",
    )
    .bind(&dto.url)
    .bind(&dto.category)
    .bind(dto.favorite.unwrap_or(false))
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(bookmark)))
}

/// GET /bookmarks — list the caller's bookmarks, newest first.
pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Bookmark>>> {
    let bookmarks = sqlx::query_as::<_, Bookmark>(
        "SELECT id, url, category, favorite, owner, created_at
         FROM bookmarks WHERE owner = $1
         ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(bookmarks))
}

/// PATCH /bookmarks/:id — update category and/or favorite flag.
pub async fn update_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookmarkRequest>,
) -> AppResult<Json<Bookmark>> {
    req.validate().map_err(validation_error)?;

    fetch_owned_bookmark(&state.pool, id, auth.user_id).await?;

    let dto = UpdateBookmarkDto {
        category: req.category,
        favorite: req.favorite,
    };

    let updated = sqlx::query_as::<_, Bookmark>(
        "UPDATE bookmarks
         SET category = COALESCE($1, category),
             favorite = COALESCE($2, favorite)
         WHERE id = $3 AND owner = $4
         RETURNING id, url, category, favorite, owner, created_at",
    )
    .bind(&dto.category)
    .bind(dto.favorite)
    .bind(id)
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(updated))
}

/// DELETE /bookmarks/:id
pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    fetch_owned_bookmark(&state.pool, id, auth.user_id).await?;

    sqlx::query("DELETE FROM bookmarks WHERE id = $1 AND owner = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DeleteByUrlQuery {
    pub url: String,
}

/// DELETE /bookmarks/by-url?url=<encoded-url> — remove the caller's
/// bookmarks matching the exact URL. Used by the failed-URL diagnostics
/// view, where only the URL string is at hand.
pub async fn delete_bookmark_by_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<DeleteByUrlQuery>,
) -> AppResult<StatusCode> {
    let result = sqlx::query("DELETE FROM bookmarks WHERE url = $1 AND owner = $2")
        .bind(&params.url)
        .bind(auth.user_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Bookmark not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}
