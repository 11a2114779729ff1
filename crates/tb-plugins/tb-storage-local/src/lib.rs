//! # tb-storage-local
//!
//! Local filesystem implementation of `MediaStore`.
//! Features: Content-addressable storage, directory sharding, and thumbnailing
//! for image uploads (audio and other media are stored as-is).

use async_trait::async_trait;
use image::io::Reader as ImageReader;
use sha2::{Digest, Sha256};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tb_core::traits::MediaStore;
use tokio::fs;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix,
        }
    }

    /// Media ids are sha256 hex produced by `save_upload`. Anything else
    /// cannot exist on disk, and must not reach `sharded_path`: slicing a
    /// non-ASCII string panics, and separators would splice into the path.
    fn valid_media_id(media_id: &str) -> bool {
        media_id.len() >= 4 && media_id.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Generates a sharded path: "ab/cd/ef...hash"
    fn sharded_path(&self, hash: &str) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&hash[0..2]);
        path.push(&hash[2..4]);
        path.push(hash);
        path
    }

    /// Internal helper to generate a 250px WebP thumbnail next to the original.
    async fn generate_thumbnail(&self, source_path: &Path, hash: &str) -> anyhow::Result<()> {
        let data = fs::read(source_path).await?;
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .decode()?;

        let thumb = img.thumbnail(250, 250);
        let mut thumb_path = source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        thumb_path.push(format!("thumb_{hash}.webp"));

        thumb.save_with_format(thumb_path, image::ImageFormat::WebP)?;
        Ok(())
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an upload using its SHA-256 hash as the media id.
    /// This automatically deduplicates files.
    async fn save_upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(&data);
        let hash = format!("{:x}", hasher.finalize());

        let target_path = self.sharded_path(&hash);
        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if !fs::try_exists(&target_path).await? {
            fs::write(&target_path, &data).await?;

            // Only images get a thumbnail; a failed decode is logged, not fatal.
            if content_type.starts_with("image/") {
                if let Err(e) = self.generate_thumbnail(&target_path, &hash).await {
                    log::warn!("thumbnail generation failed for {hash}: {e}");
                }
            }
        }

        Ok(hash)
    }

    async fn resolve_url(&self, media_id: &str) -> Option<String> {
        if !Self::valid_media_id(media_id) {
            return None;
        }
        let path = self.sharded_path(media_id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }
        Some(format!(
            "{}/{}/{}/{}",
            self.url_prefix,
            &media_id[0..2],
            &media_id[2..4],
            media_id
        ))
    }

    async fn resolve_thumbnail_url(&self, media_id: &str) -> Option<String> {
        if !Self::valid_media_id(media_id) {
            return None;
        }
        let mut path = self.sharded_path(media_id);
        path.set_file_name(format!("thumb_{media_id}.webp"));
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return None;
        }
        Some(format!(
            "{}/{}/{}/thumb_{}.webp",
            self.url_prefix,
            &media_id[0..2],
            &media_id[2..4],
            media_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_store() -> LocalMediaStore {
        let mut root = std::env::temp_dir();
        root.push(format!("tb-storage-test-{}", uuid::Uuid::now_v7()));
        LocalMediaStore::new(root, "/static/uploads".to_string())
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 30, 30]));
        let mut buf = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_image_upload_resolves_url_and_thumbnail() {
        let store = scratch_store();
        let id = store.save_upload(tiny_png(), "image/png").await.unwrap();

        let url = store.resolve_url(&id).await.expect("url should resolve");
        assert!(url.starts_with("/static/uploads/"));
        assert!(url.ends_with(&id));

        let thumb = store
            .resolve_thumbnail_url(&id)
            .await
            .expect("image uploads get a thumbnail");
        assert!(thumb.ends_with(".webp"));
    }

    #[tokio::test]
    async fn test_identical_uploads_deduplicate() {
        let store = scratch_store();
        let a = store.save_upload(tiny_png(), "image/png").await.unwrap();
        let b = store.save_upload(tiny_png(), "image/png").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_audio_upload_has_no_thumbnail() {
        let store = scratch_store();
        let id = store
            .save_upload(vec![0u8; 64], "audio/mpeg")
            .await
            .unwrap();

        assert!(store.resolve_url(&id).await.is_some());
        assert!(store.resolve_thumbnail_url(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_media_id_resolves_to_none() {
        let store = scratch_store();
        assert!(store.resolve_url("deadbeef").await.is_none());
        assert!(store.resolve_url("ab").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_media_ids_resolve_to_none() {
        let store = scratch_store();
        // Non-hex ids come straight from callers; they must return None,
        // never panic on a byte slice or escape the storage root.
        assert!(store.resolve_url("あいうえお").await.is_none());
        assert!(store.resolve_url("../../etc/passwd").await.is_none());
        assert!(store.resolve_url("ab/cd/deadbeef").await.is_none());
        assert!(store.resolve_thumbnail_url("あいうえお").await.is_none());
        assert!(store.resolve_thumbnail_url("../../etc/passwd").await.is_none());
    }
}
