/// Upload storage for post images
///
/// Images are written below the media root as `posts/<file name>`. When that
/// name is already taken a random 7-character suffix is appended to the stem.
use crate::error::{AppError, Result};
use async_trait::async_trait;
use rand::{distributions::Alphanumeric, Rng};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Sub-directory every post image lands in
pub const UPLOAD_DIR: &str = "posts";

const SUFFIX_LEN: usize = 7;
const MAX_NAME_ATTEMPTS: usize = 16;

/// `posts.image` is VARCHAR(255); the stored path is `posts/<name>`
const MAX_STORED_PATH: usize = 255;
/// Longest sanitized name that still fits once `_<suffix>` is added
const MAX_NAME_BYTES: usize = MAX_STORED_PATH - UPLOAD_DIR.len() - 1 - (SUFFIX_LEN + 1);

#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persist `data` and return its path relative to the media root
    async fn save(&self, file_name: &str, data: &[u8]) -> Result<String>;

    /// Public URL for a stored relative path
    fn url(&self, path: &str) -> String;
}

pub struct LocalMediaStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn save(&self, file_name: &str, data: &[u8]) -> Result<String> {
        let dir = self.root.join(UPLOAD_DIR);
        fs::create_dir_all(&dir).await?;

        let name = sanitize_file_name(file_name);
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = if attempt == 0 {
                name.clone()
            } else {
                with_random_suffix(&name)
            };

            // create_new makes the existence check and the create one step
            let file = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(dir.join(&candidate))
                .await;

            match file {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;

                    let relative = format!("{}/{}", UPLOAD_DIR, candidate);
                    info!(path = %relative, size_bytes = data.len(), "Stored upload");
                    return Ok(relative);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(format!(
            "could not find a free name for upload '{}'",
            name
        )))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Keep only the final path component and a conservative character set
fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| match c {
            c if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') => c,
            _ => '_',
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        truncate_name(cleaned)
    }
}

/// Shorten the stem so the name fits `MAX_NAME_BYTES`, keeping the extension
fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME_BYTES {
        return name.to_string();
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < MAX_NAME_BYTES / 2 => {
            (stem, Some(ext))
        }
        _ => (name, None),
    };

    let room = MAX_NAME_BYTES - ext.map_or(0, |ext| ext.len() + 1);
    let mut end = room.min(stem.len());
    while !stem.is_char_boundary(end) {
        end -= 1;
    }

    match ext {
        Some(ext) => format!("{}.{}", &stem[..end], ext),
        None => stem[..end].to_string(),
    }
}

fn with_random_suffix(name: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect();

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, suffix, ext),
        _ => format!("{}_{}", name, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\my cat.gif"), "my_cat.gif");
        assert_eq!(sanitize_file_name(""), "image");
        assert_eq!(sanitize_file_name("..."), "image");
    }

    #[test]
    fn long_names_are_shortened_keeping_the_extension() {
        let name = sanitize_file_name(&format!("{}.gif", "x".repeat(300)));
        assert_eq!(name.len(), MAX_NAME_BYTES);
        assert!(name.ends_with(".gif"));

        let wide = sanitize_file_name(&"é".repeat(200));
        assert!(wide.len() <= MAX_NAME_BYTES);
        assert!(wide.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn long_upload_names_fit_the_image_column() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/media/");
        let file_name = format!("{}.gif", "x".repeat(300));

        let first = storage.save(&file_name, b"one").await.unwrap();
        let second = storage.save(&file_name, b"two").await.unwrap();

        for path in [&first, &second] {
            assert!(path.chars().count() <= MAX_STORED_PATH, "{path}");
            assert!(path.ends_with(".gif"));
            assert!(dir.path().join(path).exists());
        }
        assert_ne!(first, second);
    }

    #[test]
    fn suffix_goes_before_the_extension() {
        let name = with_random_suffix("small.gif");
        assert!(name.starts_with("small_"));
        assert!(name.ends_with(".gif"));
        assert_eq!(name.len(), "small_.gif".len() + SUFFIX_LEN);
    }

    #[tokio::test]
    async fn saves_under_posts_and_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "/media/");

        let first = storage.save("small.gif", b"one").await.unwrap();
        let second = storage.save("small.gif", b"two").await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));

        let stored = tokio::fs::read(dir.path().join(&second)).await.unwrap();
        assert_eq!(stored, b"two");
    }

    #[test]
    fn url_joins_base_and_path() {
        let storage = LocalMediaStorage::new("media", "/media/");
        assert_eq!(storage.url("posts/a.png"), "/media/posts/a.png");
    }
}
