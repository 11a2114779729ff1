//! # tb-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `tb-core` domain models. Posts keep their tag list as a JSON column
//! (the document shape the domain uses); the tag registry is its own table
//! with a UNIQUE name backing the atomic find-or-create upsert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tb_core::error::AppError;
use tb_core::models::{NewPost, Post, PostPatch, Tag};
use tb_core::traits::{PostStore, TagRegistry};
use uuid::Uuid;

pub struct SqliteStore {
    pool: SqlitePool,
}

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn row_to_post(row: &sqlx::sqlite::SqliteRow) -> Post {
    Post {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        title: row.get("title"),
        description: row.get("description"),
        tags: serde_json::from_str(&row.get::<String, _>("tags")).unwrap_or_default(),
        year: row.get("year"),
        owner: row.get("owner"),
        media_id: row.get("media_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl SqliteStore {
    /// Connects and creates the schema if it does not exist yet.
    ///
    /// # Developer Note
    /// A single connection: SQLite serialises writers anyway, and it keeps
    /// `sqlite::memory:` tests on one shared database.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS posts (
                id          BLOB PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL,
                tags        TEXT NOT NULL,
                year        INTEGER,
                owner       TEXT NOT NULL,
                media_id    TEXT,
                created_at  DATETIME NOT NULL,
                updated_at  DATETIME NOT NULL
            )",
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS tags (
                id   BLOB PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            )",
        )
        .execute(&pool)
        .await?;

        log::debug!("sqlite schema ready at {url}");
        Ok(Self { pool })
    }
}

#[async_trait]
impl PostStore for SqliteStore {
    async fn list_all(&self) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query("SELECT * FROM posts ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn list_for_owner(&self, owner: &str) -> anyhow::Result<Vec<Post>> {
        let rows = sqlx::query("SELECT * FROM posts WHERE owner = ? ORDER BY created_at ASC")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn get(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_post))
    }

    async fn insert(&self, post: NewPost) -> anyhow::Result<Uuid> {
        let id = Uuid::now_v7();
        let now: DateTime<Utc> = Utc::now();

        sqlx::query(
            "INSERT INTO posts (id, title, description, tags, year, owner, media_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(id))
        .bind(post.title)
        .bind(post.description)
        .bind(serde_json::to_string(&post.tags)?)
        .bind(post.year)
        .bind(post.owner)
        .bind(post.media_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Read-modify-write inside a transaction so `updated_at` and the patched
    /// columns land together.
    async fn patch(&self, id: Uuid, patch: PostPatch) -> anyhow::Result<Uuid> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT * FROM posts WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&mut *tx)
            .await?;

        let existing = match row {
            Some(row) => row_to_post(&row),
            None => {
                return Err(AppError::NotFound("Post".to_string(), id.to_string()).into());
            }
        };

        let title = patch.title.unwrap_or(existing.title);
        let description = patch.description.unwrap_or(existing.description);
        let tags = patch.tags.unwrap_or(existing.tags);
        let year = patch.year.or(existing.year);
        let media_id = patch.media_id.or(existing.media_id);

        sqlx::query(
            "UPDATE posts
             SET title = ?, description = ?, tags = ?, year = ?, media_id = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(title)
        .bind(description)
        .bind(serde_json::to_string(&tags)?)
        .bind(year)
        .bind(media_id)
        .bind(Utc::now())
        .bind(uuid_to_blob(id))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }
}

#[async_trait]
impl TagRegistry for SqliteStore {
    async fn list(&self) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
                name: row.get("name"),
            })
            .collect())
    }

    async fn find_by_name(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query("SELECT id, name FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Tag {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            name: row.get("name"),
        }))
    }

    /// Single upsert, so concurrent identical names converge on one row. The
    /// no-op DO UPDATE makes RETURNING yield the existing id on conflict.
    async fn find_or_create(&self, name: &str) -> anyhow::Result<Uuid> {
        let row = sqlx::query(
            "INSERT INTO tags (id, name) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET name = excluded.name
             RETURNING id",
        )
        .bind(uuid_to_blob(Uuid::now_v7()))
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()))
    }
}
