/// HTTP handlers for blog endpoints
///
/// This module contains handlers for:
/// - Posts: landing, group and profile feeds, detail, create and edit
/// - Comments: adding a comment to a post
/// - Follows: the personalized feed plus follow/unfollow actions
/// - About: static pages
/// - Health: liveness and readiness probes
///
/// Every view answers with its context as JSON; the presentation layer that
/// turns it into HTML lives elsewhere.
pub mod about;
pub mod comments;
pub mod follows;
pub mod health;
pub mod posts;

pub use about::{about_author, about_tech};
pub use comments::add_comment;
pub use follows::{follow_index, profile_follow, profile_unfollow};
pub use health::{health_summary, liveness_check, readiness_summary};
pub use posts::{
    group_posts, index, post_create, post_create_form, post_detail, post_edit, post_edit_form,
    profile,
};

use crate::cache::PageCache;
use crate::config::BlogSettings;
use crate::db::BlogStore;
use crate::error::Result;
use crate::media::MediaStorage;
use crate::models::{CommentRecord, FollowRecord, Group, PostFilter, PostRecord, User};
use crate::pagination::{Page, PageQuery, Paginator};
use actix_web::http::header::{self, ContentType};
use actix_web::HttpResponse;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Shared state handed to every handler
pub struct AppState {
    pub store: Arc<dyn BlogStore>,
    pub page_cache: Arc<PageCache>,
    pub media: Arc<dyn MediaStorage>,
    pub settings: BlogSettings,
}

impl AppState {
    /// Count the feed, then fetch only the requested page of it
    pub async fn paginate(&self, filter: PostFilter, query: &PageQuery) -> Result<Page<PostView>> {
        let count = self.store.count_posts(filter).await?;
        let paginator = Paginator::new(count, self.settings.posts_per_page);
        let window = paginator.window(query.page.as_deref());

        let records = if window.limit == 0 {
            Vec::new()
        } else {
            self.store
                .list_posts(filter, window.limit, window.offset)
                .await?
        };

        Ok(paginator
            .page(window, records)
            .map(|record| self.post_view(record)))
    }

    pub fn post_view(&self, record: PostRecord) -> PostView {
        let preview = record.post.preview();
        let image_url = record.post.image.as_deref().map(|path| self.media.url(path));

        PostView {
            id: record.post.id,
            text: record.post.text,
            preview,
            created_at: record.post.created_at,
            author: record.author,
            group: record.group,
            image: record.post.image,
            image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub text: String,
    pub preview: String,
    pub created_at: DateTime<Utc>,
    pub author: User,
    pub group: Option<Group>,
    pub image: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: User,
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        Self {
            id: record.comment.id,
            text: record.comment.text,
            created_at: record.comment.created_at,
            author: record.author,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowView {
    pub id: i64,
    pub user: User,
    pub author: User,
}

impl From<FollowRecord> for FollowView {
    fn from(record: FollowRecord) -> Self {
        Self {
            id: record.follow.id,
            user: record.user,
            author: record.author,
        }
    }
}

/// Serialize a view context into a response body
pub fn render_body(context: &impl Serialize) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(context)?))
}

pub fn json_page(body: Bytes) -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body)
}

pub fn render(context: &impl Serialize) -> Result<HttpResponse> {
    Ok(json_page(render_body(context)?))
}

pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}
