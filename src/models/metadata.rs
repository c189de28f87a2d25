use serde::{Deserialize, Serialize};

use super::Bookmark;

/// Link metadata derived from a fetched page, returned by
/// `GET /api/fetchMetadata`.
///
/// All four keys are always present on success. A field whose tag is missing
/// from the page is the empty string, never null — per-field absence is not
/// an error. `domain` is the normalized hostname of the input URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataDto {
    pub domain: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
}

/// One hydrated bookmark card: the stored row flattened with its fetched
/// metadata.
#[derive(Debug, Serialize)]
pub struct BookmarkMetadata {
    #[serde(flatten)]
    pub bookmark: Bookmark,
    #[serde(flatten)]
    pub metadata: MetadataDto,
}

/// Aggregate result of batch hydration. `failed` holds the URLs whose fetch
/// failed; a failure there never removes anything from `resolved` beyond the
/// failing URL itself, and no ordering is guaranteed.
#[derive(Debug, Serialize)]
pub struct HydrationDto {
    pub resolved: Vec<BookmarkMetadata>,
    pub failed: Vec<String>,
}
