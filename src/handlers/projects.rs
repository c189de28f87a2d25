use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{Bookmark, CreateProjectDto, Project, ProjectBookmark, UpdateProjectDto},
    state::AppState,
};

// ============================================================================
// Input validation
// ============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "project name must be 1–100 characters"))]
    pub name: String,
    #[validate(url(message = "live_preview must be a valid URL"))]
    pub live_preview: Option<String>,
    #[validate(url(message = "github must be a valid URL"))]
    pub github: Option<String>,
}

/// Distinguishes an omitted field from an explicit `null`: omitted fields
/// deserialize to `None` via the default, while both `null` and a value
/// land in `Some(...)`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Link fields are tri-state: omitted = keep, `null` = clear, string =
/// replace.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 100, message = "project name must be 1–100 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub live_preview: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub github: Option<Option<String>>,
}

impl UpdateProjectRequest {
    /// `#[validate(url)]` cannot see through the tri-state wrapper, so the
    /// link fields are checked by hand.
    fn validate_links(&self) -> AppResult<()> {
        for (field, value) in [
            ("live_preview", &self.live_preview),
            ("github", &self.github),
        ] {
            if let Some(Some(link)) = value {
                if Url::parse(link).is_err() {
                    return Err(AppError::Validation(format!(
                        "{field} must be a valid URL"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LinkBookmarkRequest {
    pub bookmark_id: Uuid,
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

async fn fetch_owned_project(pool: &sqlx::PgPool, id: Uuid, owner: Uuid) -> AppResult<Project> {
    sqlx::query_as::<_, Project>(
        "SELECT id, name, live_preview, github, owner, created_at
         FROM projects WHERE id = $1 AND owner = $2",
    )
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Project not found".into()))
}

// ============================================================================
// Project handlers
// ============================================================================

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<CreateProjectRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    req.validate().map_err(validation_error)?;

    let dto = CreateProjectDto {
        name: req.name,
        live_preview: req.live_preview,
        github: req.github,
    };

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (name, live_preview, github, owner)
         VALUES ($1, $2, $3, $4)
         RETURNING id, name, live_preview, github, owner, created_at",
    )
    .bind(&dto.name)
    .bind(&dto.live_preview)
    .bind(&dto.github)
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /projects — list the caller's projects.
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Project>>> {
    let projects = sqlx::query_as::<_, Project>(
        "SELECT id, name, live_preview, github, owner, created_at
         FROM projects WHERE owner = $1
         ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(projects))
}

/// PATCH /projects/:id — partial update of name / github / live-preview links.
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> AppResult<Json<Project>> {
    req.validate().map_err(validation_error)?;
    req.validate_links()?;

    fetch_owned_project(&state.pool, id, auth.user_id).await?;

    let dto = UpdateProjectDto {
        name: req.name,
        live_preview: req.live_preview,
        github: req.github,
    };

    // Each link binds a touched flag plus the new value (which may be NULL),
    // so an explicit null clears the column while an omitted field keeps it.
    let updated = sqlx::query_as::<_, Project>(
        "UPDATE projects
         SET name         = COALESCE($1, name),
             live_preview = CASE WHEN $2 THEN $3 ELSE live_preview END,
             github       = CASE WHEN $4 THEN $5 ELSE github END
         WHERE id = $6 AND owner = $7
         RETURNING id, name, live_preview, github, owner, created_at",
    )
    .bind(&dto.name)
    .bind(dto.live_preview.is_some())
    .bind(dto.live_preview.clone().flatten())
    .bind(dto.github.is_some())
    .bind(dto.github.clone().flatten())
    .bind(id)
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok(Json(updated))
}

/// DELETE /projects/:id — delete a project; associations cascade.
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    fetch_owned_project(&state.pool, id, auth.user_id).await?;

    sqlx::query("DELETE FROM projects WHERE id = $1 AND owner = $2")
        .bind(id)
        .bind(auth.user_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Association handlers
// ============================================================================

/// POST /projects/:id/bookmarks — link a bookmark to a project. Both rows
/// must belong to the caller.
pub async fn link_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
    Json(req): Json<LinkBookmarkRequest>,
) -> AppResult<(StatusCode, Json<ProjectBookmark>)> {
    fetch_owned_project(&state.pool, project_id, auth.user_id).await?;

    let bookmark_exists: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM bookmarks WHERE id = $1 AND owner = $2")
            .bind(req.bookmark_id)
            .bind(auth.user_id)
            .fetch_optional(&state.pool)
            .await?;

    if bookmark_exists.is_none() {
        return Err(AppError::NotFound("Bookmark not found".into()));
    }

    let association = sqlx::query_as::<_, ProjectBookmark>(
        "INSERT INTO project_bookmarks (project_id, bookmark_id, owner)
         VALUES ($1, $2, $3)
         RETURNING project_id, bookmark_id, owner",
    )
    .bind(project_id)
    .bind(req.bookmark_id)
    .bind(auth.user_id)
    .fetch_one(&state.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(association)))
}

/// GET /projects/:id/bookmarks — the bookmarks linked to a project.
pub async fn list_project_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Bookmark>>> {
    fetch_owned_project(&state.pool, project_id, auth.user_id).await?;

    let bookmarks = sqlx::query_as::<_, Bookmark>(
        "SELECT b.id, b.url, b.category, b.favorite, b.owner, b.created_at
         FROM bookmarks b
         JOIN project_bookmarks pb ON pb.bookmark_id = b.id
         WHERE pb.project_id = $1 AND pb.owner = $2
         ORDER BY b.created_at DESC",
    )
    .bind(project_id)
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(bookmarks))
}

/// DELETE /projects/:id/bookmarks/:bookmark_id — unlink a bookmark.
pub async fn unlink_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((project_id, bookmark_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    fetch_owned_project(&state.pool, project_id, auth.user_id).await?;

    let result = sqlx::query(
        "DELETE FROM project_bookmarks
         WHERE project_id = $1 AND bookmark_id = $2 AND owner = $3",
    )
    .bind(project_id)
    .bind(bookmark_id)
    .bind(auth.user_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Association not found".into()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /project-bookmarks — all of the caller's associations in one list,
/// for bulk-loading the client's project view.
pub async fn list_all_associations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<Vec<ProjectBookmark>>> {
    let associations = sqlx::query_as::<_, ProjectBookmark>(
        "SELECT project_id, bookmark_id, owner
         FROM project_bookmarks WHERE owner = $1",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(associations))
}
