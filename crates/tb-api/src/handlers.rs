//! # tb-api Handlers
//!
//! This module coordinates the flow between HTTP requests and Core traits:
//! resolve identity, resolve tag names to ids, run the ranker, decorate with
//! media URLs, respond.

use crate::error::ApiError;
use actix_multipart::Multipart;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::future::join_all;
use futures_util::TryStreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tb_core::error::AppError;
use tb_core::models::{NewPost, Post, PostPatch, RankedPost, TagKey};
use tb_core::search::{rank_posts, FilterPolicy, ScorePolicy};
use tb_core::traits::{IdentityProvider, MediaStore, PostStore, TagRegistry, TagSuggester};
use uuid::Uuid;

/// State shared across all Actix-web workers. Arcs because one plugin may
/// implement several ports (the SQLite store covers posts and tags).
pub struct AppState {
    pub posts: Arc<dyn PostStore>,
    pub tags: Arc<dyn TagRegistry>,
    pub media: Arc<dyn MediaStore>,
    pub tagger: Arc<dyn TagSuggester>,
    pub auth: Arc<dyn IdentityProvider>,
}

type ApiResult = Result<HttpResponse, ApiError>;

pub async fn healthz() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// ── Tags ────────────────────────────────────────────────────────────────────

pub async fn list_tags(data: web::Data<AppState>) -> ApiResult {
    let tags = data.tags.list().await?;
    Ok(HttpResponse::Ok().json(tags))
}

#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

pub async fn create_tag(
    data: web::Data<AppState>,
    body: web::Json<CreateTagRequest>,
) -> ApiResult {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::ValidationError("tag name must not be empty".to_string()).into());
    }
    let id = data.tags.find_or_create(name).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": id })))
}

// ── Posts ───────────────────────────────────────────────────────────────────

/// Orchestrates the creation of a new post from a multipart form:
/// text fields plus an optional media file part.
pub async fn create_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    form: Multipart,
) -> ApiResult {
    let owner = require_owner(&req, data.auth.as_ref()).await?;
    let form = read_post_form(form).await?;

    let title = form.title.unwrap_or_default();
    if title.trim().is_empty() {
        return Err(AppError::ValidationError("title must not be empty".to_string()).into());
    }

    // Tag names arrive raw; unseen names become registry entries here.
    let mut tag_ids = Vec::with_capacity(form.tag_names.len());
    for name in &form.tag_names {
        tag_ids.push(data.tags.find_or_create(name).await?);
    }

    let media_id = match form.file {
        Some((bytes, content_type)) => {
            Some(data.media.save_upload(bytes, &content_type).await?)
        }
        None => None,
    };

    let id = data
        .posts
        .insert(NewPost {
            title,
            description: form.description.unwrap_or_default(),
            tags: tag_ids,
            year: form.year,
            owner,
            media_id,
        })
        .await?;

    log::info!("created post {id}");
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    /// Tag names; the full list replaces the post's tags when present.
    pub tags: Option<Vec<String>>,
    pub year: Option<i32>,
    pub media_id: Option<String>,
}

/// Partial update; only the owner may patch a post.
pub async fn update_post(
    data: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePostRequest>,
) -> ApiResult {
    let owner = require_owner(&req, data.auth.as_ref()).await?;
    let id = path.into_inner();

    let existing = data
        .posts
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post".to_string(), id.to_string()))?;
    if existing.owner != owner {
        return Err(AppError::Forbidden("not the post owner".to_string()).into());
    }

    let body = body.into_inner();
    let tags = match body.tags {
        Some(names) => {
            let mut ids = Vec::with_capacity(names.len());
            for name in &names {
                ids.push(data.tags.find_or_create(name).await?);
            }
            Some(ids)
        }
        None => None,
    };

    let id = data
        .posts
        .patch(
            id,
            PostPatch {
                title: body.title,
                description: body.description,
                tags,
                year: body.year,
                media_id: body.media_id,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "id": id })))
}

/// The caller's own posts, decorated with media URLs.
pub async fn my_posts(data: web::Data<AppState>, req: HttpRequest) -> ApiResult {
    let owner = require_owner(&req, data.auth.as_ref()).await?;
    let posts = data.posts.list_for_owner(&owner).await?;
    let decorated = decorate(data.media.as_ref(), posts).await;
    Ok(HttpResponse::Ok().json(decorated))
}

// ── Search ──────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SearchRequest {
    /// The raw text the weights were produced from. Carried for interface
    /// symmetry with /search/text; ranking never reads it.
    #[serde(default)]
    pub query: String,
    pub year: i32,
    /// Weights keyed by tag name or tag id (uuid string).
    pub weights: HashMap<String, f64>,
}

pub async fn search(data: web::Data<AppState>, body: web::Json<SearchRequest>) -> ApiResult {
    let body = body.into_inner();
    let weights = resolve_weights(data.tags.as_ref(), body.weights).await?;
    let ranked = run_search(data.get_ref(), body.year, &weights).await?;
    Ok(HttpResponse::Ok().json(ranked))
}

#[derive(Deserialize)]
pub struct TextSearchRequest {
    pub query: String,
    pub year: i32,
}

/// Free-text search: the external tagging service turns the query into a
/// weighted tag set, then the same pipeline as /search runs.
pub async fn search_text(
    data: web::Data<AppState>,
    body: web::Json<TextSearchRequest>,
) -> ApiResult {
    let body = body.into_inner();

    let known: Vec<String> = data
        .tags
        .list()
        .await?
        .into_iter()
        .map(|t| t.name)
        .collect();

    let suggestions = data
        .tagger
        .suggest(&body.query, &known)
        .await
        .map_err(|e| AppError::Upstream(format!("tag suggestion failed: {e}")))?;

    let by_name: HashMap<String, f64> =
        suggestions.into_iter().map(|s| (s.tag, s.weight)).collect();
    let weights = resolve_weights(data.tags.as_ref(), by_name).await?;
    let ranked = run_search(data.get_ref(), body.year, &weights).await?;
    Ok(HttpResponse::Ok().json(ranked))
}

// ── Media ───────────────────────────────────────────────────────────────────

pub async fn media_url(data: web::Data<AppState>, path: web::Path<String>) -> ApiResult {
    let media_id = path.into_inner();
    let url = data
        .media
        .resolve_url(&media_id)
        .await
        .ok_or_else(|| AppError::NotFound("Media".to_string(), media_id.clone()))?;
    let thumbnail_url = data.media.resolve_thumbnail_url(&media_id).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "url": url,
        "thumbnail_url": thumbnail_url,
    })))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Extracts the bearer token and resolves it to an owner id.
async fn require_owner(
    req: &HttpRequest,
    auth: &dyn IdentityProvider,
) -> Result<String, ApiError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    auth.resolve(token)
        .await
        .ok_or_else(|| ApiError(AppError::Unauthorized("missing or invalid token".to_string())))
}

/// Converts name-or-id weight keys into the id-keyed map the ranker consumes.
/// Names with no registry entry drop out silently and contribute no score.
async fn resolve_weights(
    registry: &dyn TagRegistry,
    raw: HashMap<String, f64>,
) -> Result<HashMap<Uuid, f64>, ApiError> {
    let mut weights = HashMap::with_capacity(raw.len());
    for (key, weight) in raw {
        match TagKey::parse(&key) {
            TagKey::Id(id) => {
                weights.insert(id, weight);
            }
            TagKey::Name(name) => {
                if let Some(tag) = registry.find_by_name(&name).await? {
                    weights.insert(tag.id, weight);
                }
            }
        }
    }
    Ok(weights)
}

/// Filter, score, sort, then decorate: ordering is fixed before any URL
/// resolution happens.
async fn run_search(
    state: &AppState,
    target_year: i32,
    weights: &HashMap<Uuid, f64>,
) -> Result<Vec<RankedPost>, ApiError> {
    let posts = state.posts.list_all().await?;
    let ranked = rank_posts(
        posts,
        target_year,
        weights,
        FilterPolicy::default(),
        ScorePolicy::default(),
    );
    Ok(decorate(state.media.as_ref(), ranked).await)
}

/// Resolves media URLs for each post. The per-post lookups are independent,
/// so they run concurrently; `join_all` preserves the input order.
async fn decorate(media: &dyn MediaStore, posts: Vec<Post>) -> Vec<RankedPost> {
    join_all(posts.into_iter().map(|post| async move {
        let (url, thumbnail_url) = match post.media_id.as_deref() {
            Some(id) => (
                media.resolve_url(id).await,
                media.resolve_thumbnail_url(id).await,
            ),
            None => (None, None),
        };
        RankedPost {
            post,
            url,
            thumbnail_url,
        }
    }))
    .await
}

/// Accumulated multipart fields for post creation.
#[derive(Default)]
struct PostForm {
    title: Option<String>,
    description: Option<String>,
    tag_names: Vec<String>,
    year: Option<i32>,
    file: Option<(Vec<u8>, String)>,
}

async fn read_post_form(mut payload: Multipart) -> Result<PostForm, ApiError> {
    let mut form = PostForm::default();

    while let Some(mut field) = payload.try_next().await.map_err(bad_multipart)? {
        let name = field.name().to_string();
        if name == "file" {
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let mut bytes = Vec::new();
            while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
                bytes.extend_from_slice(&chunk);
            }
            form.file = Some((bytes, content_type));
            continue;
        }

        let mut raw = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_multipart)? {
            raw.extend_from_slice(&chunk);
        }
        let text = String::from_utf8(raw)
            .map_err(|_| AppError::ValidationError(format!("field '{name}' is not UTF-8")))?;

        match name.as_str() {
            "title" => form.title = Some(text),
            "description" => form.description = Some(text),
            // JSON array of tag names, e.g. ["cars", "classic"]
            "tags" => {
                form.tag_names = serde_json::from_str(&text).map_err(|_| {
                    AppError::ValidationError("tags must be a JSON array of names".to_string())
                })?;
            }
            "year" if !text.trim().is_empty() => {
                let year = text.trim().parse::<i32>().map_err(|_| {
                    AppError::ValidationError(format!("year '{text}' is not an integer"))
                })?;
                form.year = Some(year);
            }
            // Unknown fields (and blank years) are ignored
            _ => {}
        }
    }

    Ok(form)
}

fn bad_multipart(err: actix_multipart::MultipartError) -> ApiError {
    ApiError(AppError::ValidationError(format!("malformed multipart body: {err}")))
}
