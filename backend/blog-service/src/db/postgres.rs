use super::BlogStore;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentRecord, Follow, FollowRecord, Group, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostFilter, PostRecord, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const POST_SELECT: &str = r#"
    SELECT p.id, p.text, p.created_at, p.author_id, p.group_id, p.image,
           u.username AS author_username,
           g.title AS group_title, g.slug AS group_slug, g.description AS group_description
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id
"#;

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    group_id: Option<i64>,
    image: Option<String>,
    author_username: String,
    group_title: Option<String>,
    group_slug: Option<String>,
    group_description: Option<String>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(Group {
                id,
                title,
                slug,
                description: row.group_description.unwrap_or_default(),
            }),
            _ => None,
        };

        PostRecord {
            author: User {
                id: row.author_id,
                username: row.author_username,
            },
            post: Post {
                id: row.id,
                text: row.text,
                created_at: row.created_at,
                author_id: row.author_id,
                group_id: group.as_ref().map(|g| g.id),
                image: row.image,
            },
            group,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
    author_username: String,
}

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: i64,
    user_id: Uuid,
    author_id: Uuid,
    user_username: String,
    author_username: String,
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgBlogStore {
    pool: PgPool,
}

impl PgBlogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            qb.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            qb.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            qb.push(" WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

fn unique_violation_as_conflict(err: sqlx::Error, what: String) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict(what),
        _ => AppError::Database(err),
    }
}

#[async_trait]
impl BlogStore for PgBlogStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username)
            VALUES ($1, $2)
            RETURNING id, username
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_violation_as_conflict(e, format!("username '{}' is taken", username))
        })
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, username FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO groups (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description
            "#,
        )
        .bind(&group.title)
        .bind(&group.slug)
        .bind(&group.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            unique_violation_as_conflict(e, format!("group slug '{}' is taken", group.slug))
        })
    }

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE id = $1",
        )
        .bind(group_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, title, slug, description FROM groups ORDER BY title, id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        // posts.group_id is ON DELETE SET NULL
        let affected = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(group_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (text, author_id, group_id, image)
            VALUES ($1, $2, $3, $4)
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(&post.text)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(post.image.as_deref())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let updated = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2, image = $3
            WHERE id = $4
            RETURNING id, text, created_at, author_id, group_id, image
            "#,
        )
        .bind(&changes.text)
        .bind(changes.group_id)
        .bind(changes.image.as_deref())
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        qb.push(" WHERE p.id = ").push_bind(post_id);

        let row = qb
            .build_query_as::<PostRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(PostRecord::from))
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        // comments.post_id is ON DELETE CASCADE
        let affected = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count.max(0) as usize)
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);

        let rows = qb.build_query_as::<PostRow>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(PostRecord::from).collect())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, post_id, author_id, text, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.post_id, c.author_id, c.text, c.created_at,
                   u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommentRecord {
                author: User {
                    id: row.author_id,
                    username: row.author_username,
                },
                comment: Comment {
                    id: row.id,
                    post_id: row.post_id,
                    author_id: row.author_id,
                    text: row.text,
                    created_at: row.created_at,
                },
            })
            .collect())
    }

    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }

        let inserted = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO follows (user_id, author_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, author_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(inserted.is_some())
    }

    async fn unfollow(&self, user_id: Uuid, author_username: &str) -> Result<u64> {
        let affected = sqlx::query(
            r#"
            DELETE FROM follows f
            USING users u
            WHERE f.author_id = u.id AND f.user_id = $1 AND u.username = $2
            "#,
        )
        .bind(user_id)
        .bind(author_username)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(affected)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)",
        )
        .bind(user_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn followers_of(&self, author_id: Uuid) -> Result<Vec<FollowRecord>> {
        let rows = sqlx::query_as::<_, FollowRow>(
            r#"
            SELECT f.id, f.user_id, f.author_id,
                   u.username AS user_username, a.username AS author_username
            FROM follows f
            JOIN users u ON u.id = f.user_id
            JOIN users a ON a.id = f.author_id
            WHERE f.author_id = $1
            ORDER BY f.id
            "#,
        )
        .bind(author_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| FollowRecord {
                follow: Follow {
                    id: row.id,
                    user_id: row.user_id,
                    author_id: row.author_id,
                },
                user: User {
                    id: row.user_id,
                    username: row.user_username,
                },
                author: User {
                    id: row.author_id,
                    username: row.author_username,
                },
            })
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
