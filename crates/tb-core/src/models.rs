//! # Domain Models
//!
//! These structs represent the core entities of Tagbox.
//! We use UUID v7 for time-ordered, globally unique identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-created media record: title, description, tags, and an optional year
/// anchoring it in time for proximity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Tag ids attached to this post. Duplicates carry no meaning and order is
    /// irrelevant for ranking; replaced wholesale on update.
    pub tags: Vec<Uuid>,
    /// Posts without a year never match a year-bounded search.
    pub year: Option<i32>,
    /// Opaque id of the creating user, immutable after creation.
    pub owner: String,
    /// Id of the media handled by MediaStore, if any was uploaded.
    pub media_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named label attachable to posts. `name` is the unique, case-sensitive
/// lookup key; tags are created lazily the first time a name is seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

/// Fields for creating a post. The store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub description: String,
    pub tags: Vec<Uuid>,
    pub year: Option<i32>,
    pub owner: String,
    pub media_id: Option<String>,
}

/// Partial update of a post. `None` fields are left untouched; `tags` replaces
/// the whole list when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<Uuid>>,
    pub year: Option<i32>,
    pub media_id: Option<String>,
}

/// A post decorated with resolved media URLs, as returned from search and
/// listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RankedPost {
    #[serde(flatten)]
    pub post: Post,
    pub url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// One weighted suggestion from the external tagging service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSuggestion {
    pub tag: String,
    pub weight: f64,
}

/// A tag reference at the API boundary: callers may key weights by tag name or
/// by tag id. Everything is resolved to an id before the ranker runs, so the
/// core algorithm only ever sees one key space.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagKey {
    Name(String),
    Id(Uuid),
}

impl TagKey {
    /// Uuid-shaped strings are ids, everything else is a name.
    pub fn parse(raw: &str) -> Self {
        match Uuid::parse_str(raw) {
            Ok(id) => TagKey::Id(id),
            Err(_) => TagKey::Name(raw.to_string()),
        }
    }
}
