use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub mod metadata;

pub use metadata::{BookmarkMetadata, HydrationDto, MetadataDto};

// ============================================================================
// User Models
// ============================================================================

/// Internal database row. Not serializable — use UserDto for API responses
/// to avoid accidentally exposing password_hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public user shape returned by all API responses.
#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// Refresh-token session row; matches the `sessions` table in migrations.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub refresh_token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Bookmark Models
// ============================================================================

/// A stored URL ("tool"): categorized, optionally favorited, owner-scoped.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Bookmark {
    pub id: Uuid,
    pub url: String,
    pub category: String,
    pub favorite: bool,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookmarkDto {
    pub url: String,
    pub category: String,
    pub favorite: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookmarkDto {
    pub category: Option<String>,
    pub favorite: Option<bool>,
}

// ============================================================================
// Project Models
// ============================================================================

/// A named grouping of bookmarks with optional GitHub and live-preview links.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub live_preview: Option<String>,
    pub github: Option<String>,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectDto {
    pub name: String,
    pub live_preview: Option<String>,
    pub github: Option<String>,
}

/// Partial project update. The link fields are tri-state: `None` leaves the
/// column alone, `Some(None)` clears it, `Some(Some(v))` replaces it.
#[derive(Debug)]
pub struct UpdateProjectDto {
    pub name: Option<String>,
    pub live_preview: Option<Option<String>>,
    pub github: Option<Option<String>>,
}

/// project ↔ bookmark association row.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectBookmark {
    pub project_id: Uuid,
    pub bookmark_id: Uuid,
    pub owner: Uuid,
}
