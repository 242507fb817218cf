/// Database access layer
///
/// `BlogStore` is the seam every handler talks to. `PgBlogStore` is the
/// production implementation over PostgreSQL; `MemoryBlogStore` keeps the same
/// semantics in process and backs the test suite.
///
/// Invariants both implementations uphold:
/// - feeds are ordered newest first, ties broken by id descending
/// - removing a group clears `group_id` on its posts
/// - removing a post removes its comments
/// - a (user, author) follow pair exists at most once and never with user == author
pub mod memory;
pub mod postgres;

pub use memory::MemoryBlogStore;
pub use postgres::PgBlogStore;

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{
    Comment, CommentRecord, FollowRecord, Group, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostFilter, PostRecord, User,
};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

#[async_trait]
pub trait BlogStore: Send + Sync {
    async fn create_user(&self, username: &str) -> Result<User>;

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>>;

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    /// All groups ordered by title, used as form choices
    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// Remove a group; its posts survive ungrouped. Returns false if absent.
    async fn delete_group(&self, group_id: i64) -> Result<bool>;

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    /// Apply edits to text, group and image. Returns None if the post is absent.
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>>;

    async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>>;

    /// Remove a post together with its comments. Returns false if absent.
    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    async fn count_posts(&self, filter: PostFilter) -> Result<usize>;

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>>;

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Every comment on a post, newest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>>;

    /// Idempotent follow; returns true only if a new relationship was stored.
    /// Self-follows are ignored here so every caller gets the same rule.
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    /// Idempotent unfollow by author username; returns the number of rows removed
    async fn unfollow(&self, user_id: Uuid, author_username: &str) -> Result<u64>;

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool>;

    /// Follow relationships pointing at `author_id`
    async fn followers_of(&self, author_id: Uuid) -> Result<Vec<FollowRecord>>;

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

/// Create the PostgreSQL pool and verify it answers within the connect timeout
pub async fn create_pool(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        idle_timeout_secs = config.idle_timeout_secs,
        max_lifetime_secs = config.max_lifetime_secs,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!("Database pool created and verified");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(error = %e, "Database connection verification failed");
            Err(e)
        }
        Err(_) => {
            error!(
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database verification timeout",
            )))
        }
    }
}

/// Apply the embedded schema migrations
pub async fn migrate(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}
