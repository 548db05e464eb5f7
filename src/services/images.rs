use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::AppResult;

/// URL prefix profile pictures are served under
pub const IMAGES_ROUTE: &str = "/images";

/// Accepted profile picture formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Webp,
}

impl ImageKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match mime.as_str() {
            "image/png" => Some(ImageKind::Png),
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/gif" => Some(ImageKind::Gif),
            "image/webp" => Some(ImageKind::Webp),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageKind::Png => "png",
            ImageKind::Jpeg => "jpg",
            ImageKind::Gif => "gif",
            ImageKind::Webp => "webp",
        }
    }
}

/// Writes uploaded profile pictures to a directory served at [`IMAGES_ROUTE`]
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves the image under a fresh name and returns its public URL
    pub async fn save(&self, user_id: i32, kind: ImageKind, bytes: &[u8]) -> AppResult<String> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let file_name = format!("{}-{}.{}", user_id, Uuid::new_v4(), kind.extension());
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        tracing::info!(user_id, file = %file_name, size = bytes.len(), "Stored profile picture");

        Ok(format!("{}/{}", IMAGES_ROUTE, file_name))
    }

    /// Deletes a picture previously returned by [`ImageStore::save`]
    ///
    /// URLs that do not point into this store are ignored.
    pub async fn remove(&self, image_url: &str) {
        let Some(file_name) = image_url
            .strip_prefix(IMAGES_ROUTE)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            return;
        };

        if let Err(e) = tokio::fs::remove_file(self.dir.join(file_name)).await {
            tracing::warn!(error = %e, file = %file_name, "Failed to remove old profile picture");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(ImageKind::from_content_type("image/png"), Some(ImageKind::Png));
        assert_eq!(
            ImageKind::from_content_type("IMAGE/JPEG; charset=binary"),
            Some(ImageKind::Jpeg)
        );
        assert_eq!(ImageKind::from_content_type("image/svg+xml"), None);
        assert_eq!(ImageKind::from_content_type("text/plain"), None);
    }

    #[tokio::test]
    async fn test_save_writes_file_and_returns_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path().join("nested"));

        let url = store.save(3, ImageKind::Png, b"\x89PNG").await.unwrap();

        assert!(url.starts_with("/images/3-"));
        assert!(url.ends_with(".png"));
        let file_name = url.trim_start_matches("/images/");
        let written = std::fs::read(dir.path().join("nested").join(file_name)).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[tokio::test]
    async fn test_remove_deletes_only_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"keep").unwrap();

        let url = store.save(1, ImageKind::Gif, b"GIF89a").await.unwrap();
        store.remove(&url).await;
        store.remove("https://example.com/images/keep.txt").await;
        store.remove("/images/../keep.txt").await;

        let file_name = url.trim_start_matches("/images/");
        assert!(!dir.path().join(file_name).exists());
        assert!(outside.exists());
    }
}
