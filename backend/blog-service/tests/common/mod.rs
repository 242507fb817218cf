#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::web;
use blog_service::cache::PageCache;
use blog_service::config::{BlogSettings, SessionConfig};
use blog_service::db::{BlogStore, MemoryBlogStore};
use blog_service::handlers::AppState;
use blog_service::media::LocalMediaStorage;
use blog_service::middleware::SessionKeys;
use blog_service::models::{Group, NewGroup, NewPost, Post, User};
use std::sync::Arc;
use tempfile::TempDir;

/// 2x1 GIF, the smallest upload the image check accepts
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0c, 0x0a, 0x00, 0x3b,
];

const BOUNDARY: &str = "----blogservicetestboundary";

/// Build the full app around a `TestBlog`, the same way `main` wires it
macro_rules! init_app {
    ($blog:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($blog.state.clone())
                .wrap(blog_service::middleware::SessionMiddleware::new(
                    $blog.keys.clone(),
                    $blog.store_dyn(),
                ))
                .wrap(actix_web::middleware::NormalizePath::new(
                    actix_web::middleware::TrailingSlash::Always,
                ))
                .configure(blog_service::routes::configure)
                .default_service(actix_web::web::to(blog_service::routes::not_found)),
        )
        .await
    };
}

/// In-memory service fixture: store, page cache, media dir and session keys
pub struct TestBlog {
    pub state: web::Data<AppState>,
    pub store: Arc<MemoryBlogStore>,
    pub page_cache: Arc<PageCache>,
    pub keys: Arc<SessionKeys>,
    pub media_dir: TempDir,
}

impl TestBlog {
    pub fn new() -> Self {
        Self::with_settings(BlogSettings::default())
    }

    pub fn with_settings(settings: BlogSettings) -> Self {
        let store = Arc::new(MemoryBlogStore::new());
        let page_cache = Arc::new(PageCache::new());
        let media_dir = tempfile::tempdir().expect("create media dir");
        let keys = Arc::new(SessionKeys::from_config(&SessionConfig::default()));

        let state = web::Data::new(AppState {
            store: store.clone(),
            page_cache: page_cache.clone(),
            media: Arc::new(LocalMediaStorage::new(media_dir.path(), "/media/")),
            settings,
        });

        Self {
            state,
            store,
            page_cache,
            keys,
            media_dir,
        }
    }

    pub fn store_dyn(&self) -> Arc<dyn BlogStore> {
        self.store.clone()
    }

    pub fn session(&self, user: &User) -> Cookie<'static> {
        let token = self.keys.issue(user).expect("issue session");
        Cookie::new(self.keys.cookie_name().to_string(), token)
    }

    pub async fn user(&self, username: &str) -> User {
        self.store.create_user(username).await.expect("create user")
    }

    pub async fn group(&self, slug: &str, title: &str) -> Group {
        self.store
            .create_group(NewGroup {
                title: title.to_string(),
                slug: slug.to_string(),
                description: format!("About {}", title),
            })
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.store
            .create_post(NewPost {
                text: text.to_string(),
                author_id: author.id,
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("create post")
    }
}

/// A file part for `multipart_body`
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

/// Encode form fields (and optionally a file) as `multipart/form-data`.
/// Returns the content-type header value and the body.
pub fn multipart_body(fields: &[(&str, &str)], file: Option<FilePart<'_>>) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some(file) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn gif_upload(file_name: &str) -> FilePart<'_> {
    FilePart {
        field: "image",
        file_name,
        content_type: "image/gif",
        data: SMALL_GIF,
    }
}
