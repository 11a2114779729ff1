//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use crate::models::{NewPost, Post, PostPatch, Tag, TagSuggestion};
use async_trait::async_trait;
use uuid::Uuid;

/// Data persistence contract for posts.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Full collection scan. Search ranks over this snapshot.
    async fn list_all(&self) -> anyhow::Result<Vec<Post>>;
    async fn list_for_owner(&self, owner: &str) -> anyhow::Result<Vec<Post>>;
    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn insert(&self, post: NewPost) -> anyhow::Result<Uuid>;
    /// Applies the patch and refreshes `updated_at`. Fails if the id is unknown.
    async fn patch(&self, id: Uuid, patch: PostPatch) -> anyhow::Result<Uuid>;
}

/// Name ↔ id lookup for tags.
#[async_trait]
pub trait TagRegistry: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<Tag>>;
    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>>;
    /// Returns the existing id for `name` or creates the tag. Must be atomic:
    /// concurrent calls with the same name converge on a single id.
    async fn find_or_create(&self, name: &str) -> anyhow::Result<Uuid>;
}

/// Media storage contract for handling uploads and URL resolution.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns a media_id for the Post model.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String>;
    /// Resolves a media_id to a displayable URL, or None if the id is unknown.
    async fn resolve_url(&self, media_id: &str) -> Option<String>;
    /// Resolves a media_id to its thumbnail URL, or None if no thumbnail exists.
    async fn resolve_thumbnail_url(&self, media_id: &str) -> Option<String>;
}

/// Remote content-analysis contract: free text in, weighted tag names out.
/// Untrusted and possibly slow; failures surface as errors, never panics.
#[async_trait]
pub trait TagSuggester: Send + Sync {
    async fn suggest(
        &self,
        query: &str,
        known_tags: &[String],
    ) -> anyhow::Result<Vec<TagSuggestion>>;
}

/// Identity resolution contract. Authentication policy lives outside this
/// service; the API only needs a token turned into a stable opaque owner id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, token: &str) -> Option<String>;
}
