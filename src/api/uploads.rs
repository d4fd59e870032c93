//! Image uploads for restaurants and menu items.
//!
//! Files are written under the configured upload directory as `{uuid}_{original name}`. Only
//! the stored file name is kept in the database.

use crate::errors::{Error, Result};
use axum::extract::Multipart;
use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

/// Accepted file extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Largest accepted upload, 5 MiB.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// True when the file name has an accepted image extension.
#[must_use]
pub fn allowed_file(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Reduces a client-supplied name to a safe single path component.
#[must_use]
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_string()
}

/// Reads the `image` field of a multipart body and stores it.
///
/// Returns the stored file name.
pub async fn save_image(upload_dir: &Path, mut multipart: Multipart) -> Result<String> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("image") {
            continue;
        }
        let original = field.file_name().map(sanitize_filename).unwrap_or_default();
        if original.is_empty() || !allowed_file(&original) {
            return Err(Error::validation(format!(
                "Unsupported file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(Error::validation("Uploaded file is empty."));
        }
        if data.len() > MAX_IMAGE_BYTES {
            return Err(Error::validation("Uploaded file is too large."));
        }

        let stored = format!("{}_{}", Uuid::new_v4(), original);
        tokio::fs::create_dir_all(upload_dir).await?;
        tokio::fs::write(upload_dir.join(&stored), &data).await?;
        info!("Stored upload {} ({} bytes)", stored, data.len());
        return Ok(stored);
    }
    Err(Error::validation("No image file provided."))
}

/// Deletes a stored image. Failures are logged and otherwise ignored.
pub async fn remove_image(upload_dir: &Path, filename: &str) {
    let name = sanitize_filename(filename);
    if name.is_empty() {
        return;
    }
    if let Err(e) = tokio::fs::remove_file(upload_dir.join(&name)).await {
        warn!("Could not remove image {}: {}", name, e);
    }
}

/// Deletes several stored images, best effort.
pub async fn remove_images<I>(upload_dir: &Path, filenames: I)
where
    I: IntoIterator<Item = String>,
{
    for name in filenames {
        remove_image(upload_dir, &name).await;
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("dish.png"));
        assert!(allowed_file("dish.JPG"));
        assert!(allowed_file("a.b.jpeg"));
        assert!(!allowed_file("dish.gif"));
        assert!(!allowed_file("png"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\img\\my dish.png"), "my_dish.png");
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
    }

    #[tokio::test]
    async fn test_remove_image_is_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.png");
        tokio::fs::write(&path, b"img").await.unwrap();

        remove_image(dir.path(), "x.png").await;
        assert!(!path.exists());
        // Removing again only logs.
        remove_image(dir.path(), "x.png").await;
    }
}
