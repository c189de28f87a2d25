use std::net::IpAddr;

use axum::extract::{Query, State};
use axum::Json;
use encoding_rs::{Encoding, UTF_8};
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use serde::Deserialize;
use url::Url;

use crate::auth::AuthUser;
use crate::config::MetadataSettings;
use crate::error::{AppError, AppResult};
use crate::models::{Bookmark, BookmarkMetadata, HydrationDto, MetadataDto};
use crate::state::AppState;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; DevshelfLinkBot/1.0)";

/// `charset=` parameter of a Content-Type header value. Third-party sites are
/// not reliably UTF-8; decoding with the declared charset is what keeps
/// non-Latin titles and descriptions intact.
static CHARSET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)charset=([^;\s]+)").unwrap());

// ── Decoding ───────────────────────────────────────────────────────────────

/// Extract the charset label from a Content-Type header value, if any.
/// Quotes around the label (`charset="utf-8"`) are stripped.
pub fn charset_from_content_type(content_type: &str) -> Option<String> {
    CHARSET_RE
        .captures(content_type)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|s| !s.is_empty())
}

/// Decode a response body using the charset declared in its Content-Type
/// header, defaulting to UTF-8 when the parameter is absent or the label is
/// unknown. Malformed sequences become replacement characters rather than
/// failing the request.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

// ── Extraction ─────────────────────────────────────────────────────────────

/// Derive a `MetadataDto` from decoded HTML. Each field is an ordered
/// first-non-empty fallback chain; a field with no matching tag ends up as
/// the empty string. `domain` is the normalized hostname of the fetched URL.
pub fn extract_metadata(html: &str, url: &Url) -> MetadataDto {
    let document = Html::parse_document(html);

    let title = title_text(&document).unwrap_or_default();

    // Pages inconsistently capitalize or omit their description tag; Open
    // Graph is the most reliable secondary source.
    let description = meta_name(&document, "description")
        .or_else(|| meta_name(&document, "Description"))
        .or_else(|| meta_property(&document, "og:description"))
        .unwrap_or_default();

    let image_url = meta_property(&document, "og:image").unwrap_or_default();

    MetadataDto {
        domain: url.host_str().unwrap_or_default().to_string(),
        title,
        description,
        image_url,
    }
}

fn meta_property(doc: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn meta_name(doc: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn title_text(doc: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    doc.select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

// ── Destination policy ─────────────────────────────────────────────────────

/// Returns `true` if `ip` is a private, loopback, or link-local address.
/// Only consulted when `block_private_addresses` is enabled; by default the
/// service fetches any http(s) URL the caller supplies.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            matches!(
                o,
                [127, ..]
                    | [10, ..]
                    | [169, 254, ..]
                    | [192, 168, ..]
                    | [0, ..]
                    | [255, 255, 255, 255]
            ) || (o[0] == 172 && (16..=31).contains(&o[1]))
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00 == 0xfc00)
                || (v6.segments()[0] & 0xffc0 == 0xfe80)
        }
    }
}

async fn reject_private_destination(parsed: &Url) -> AppResult<()> {
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Validation("URL has no host".into()))?;

    let port = parsed.port_or_known_default().unwrap_or(80);
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|_| AppError::Validation("Could not resolve URL host".into()))?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            return Err(AppError::Validation(
                "URL resolves to a private or reserved address".into(),
            ));
        }
    }

    Ok(())
}

// ── Fetch ──────────────────────────────────────────────────────────────────

/// Validate `raw_url`, fetch it once with a bounded timeout, and extract its
/// metadata. Shared by the single-URL endpoint and batch hydration.
///
/// Validation problems are 400s; everything that goes wrong past the network
/// boundary (connect/DNS/timeout, non-2xx upstream) collapses to
/// `AppError::Upstream` with the detail logged, never returned.
pub async fn fetch_remote_metadata(
    client: &reqwest::Client,
    settings: &MetadataSettings,
    raw_url: &str,
) -> AppResult<MetadataDto> {
    if raw_url.is_empty() {
        return Err(AppError::Validation("URL parameter is required".into()));
    }

    let parsed = Url::parse(raw_url).map_err(|_| AppError::Validation("Invalid URL".into()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(AppError::Validation(
                "Only http/https URLs are supported".into(),
            ))
        }
    }

    if settings.block_private_addresses {
        reject_private_destination(&parsed).await?;
    }

    let response = client
        .get(parsed.clone())
        .timeout(settings.fetch_timeout)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = ?e, url = %raw_url, "Metadata fetch failed");
            AppError::Upstream
        })?;

    if !response.status().is_success() {
        tracing::warn!(status = %response.status(), url = %raw_url, "Metadata fetch got non-success status");
        return Err(AppError::Upstream);
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let bytes = response.bytes().await.map_err(|e| {
        tracing::warn!(error = ?e, url = %raw_url, "Failed to read metadata response body");
        AppError::Upstream
    })?;

    let html = decode_body(&bytes, content_type.as_deref());
    Ok(extract_metadata(&html, &parsed))
}

// ── Handlers ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FetchMetadataQuery {
    #[serde(default)]
    pub url: String,
}

/// GET /api/fetchMetadata?url=<encoded-url>
///
/// Fetches the target page and returns `{domain, title, description,
/// imageUrl}`. 400 when the `url` parameter is missing or invalid (no
/// network call is made); 502 with a generic body when the fetch fails.
pub async fn fetch_metadata(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<FetchMetadataQuery>,
) -> AppResult<Json<MetadataDto>> {
    let dto = fetch_remote_metadata(&state.http_client, &state.metadata, &params.url).await?;
    Ok(Json(dto))
}

/// GET /bookmarks/metadata
///
/// Hydrates the caller's bookmark grid: fetches metadata for every stored
/// URL concurrently (bounded fan-out) and returns the successes together
/// with the list of URLs that failed. One unreachable site never aborts the
/// batch or stalls the other fetches.
pub async fn hydrate_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<HydrationDto>> {
    let bookmarks = sqlx::query_as::<_, Bookmark>(
        "SELECT id, url, category, favorite, owner, created_at
         FROM bookmarks WHERE owner = $1
         ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&state.pool)
    .await?;

    let results = stream::iter(bookmarks)
        .map(|bookmark| {
            let client = state.http_client.clone();
            let settings = state.metadata.clone();
            async move {
                match fetch_remote_metadata(&client, &settings, &bookmark.url).await {
                    Ok(metadata) => Ok(BookmarkMetadata { bookmark, metadata }),
                    Err(_) => Err(bookmark.url),
                }
            }
        })
        .buffer_unordered(state.metadata.batch_concurrency)
        .collect::<Vec<_>>()
        .await;

    let mut resolved = Vec::new();
    let mut failed = Vec::new();
    for result in results {
        match result {
            Ok(entry) => resolved.push(entry),
            Err(url) => failed.push(url),
        }
    }

    if !failed.is_empty() {
        tracing::warn!(count = failed.len(), "Some bookmark URLs failed to hydrate");
    }

    Ok(Json(HydrationDto { resolved, failed }))
}

// ── Unit tests ─────────────────────────────────────────────────────────────
