//! In-process store with the same semantics as the PostgreSQL schema.

use super::BlogStore;
use crate::error::{AppError, Result};
use crate::models::{
    Comment, CommentRecord, Follow, FollowRecord, Group, NewComment, NewGroup, NewPost, Post,
    PostChanges, PostFilter, PostRecord, User,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: BTreeMap<i64, Group>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    follows: BTreeMap<i64, Follow>,
    next_group_id: i64,
    next_post_id: i64,
    next_comment_id: i64,
    next_follow_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .values()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Matching posts, newest first
    fn filtered(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .values()
            .filter(|post| self.matches(post, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        posts
    }

    fn record(&self, post: &Post) -> Result<PostRecord> {
        let author = self.users.get(&post.author_id).cloned().ok_or_else(|| {
            AppError::Internal(format!("post {} references a missing author", post.id))
        })?;
        let group = post.group_id.and_then(|id| self.groups.get(&id).cloned());

        Ok(PostRecord {
            post: post.clone(),
            author,
            group,
        })
    }

    fn check_group(&self, group_id: Option<i64>) -> Result<()> {
        match group_id {
            Some(id) if !self.groups.contains_key(&id) => {
                Err(AppError::BadRequest(format!("group {} does not exist", id)))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct MemoryBlogStore {
    tables: RwLock<Tables>,
}

impl MemoryBlogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogStore for MemoryBlogStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!("username '{}' is taken", username)));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_group(&self, group: NewGroup) -> Result<Group> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(AppError::Conflict(format!(
                "group slug '{}' is taken",
                group.slug
            )));
        }

        let group = Group {
            id: Tables::next_id(&mut tables.next_group_id),
            title: group.title,
            slug: group.slug,
            description: group.description,
        };
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_group(&self, group_id: i64) -> Result<Option<Group>> {
        Ok(self.tables.read().await.groups.get(&group_id).cloned())
    }

    async fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }

    async fn delete_group(&self, group_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.groups.remove(&group_id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.group_id == Some(group_id) {
                post.group_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&post.author_id) {
            return Err(AppError::BadRequest(format!(
                "author {} does not exist",
                post.author_id
            )));
        }
        tables.check_group(post.group_id)?;

        let post = Post {
            id: Tables::next_id(&mut tables.next_post_id),
            text: post.text,
            created_at: Utc::now(),
            author_id: post.author_id,
            group_id: post.group_id,
            image: post.image,
        };
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>> {
        let mut tables = self.tables.write().await;
        tables.check_group(changes.group_id)?;

        Ok(tables.posts.get_mut(&post_id).map(|post| {
            post.text = changes.text;
            post.group_id = changes.group_id;
            post.image = changes.image;
            post.clone()
        }))
    }

    async fn get_post(&self, post_id: i64) -> Result<Option<PostRecord>> {
        let tables = self.tables.read().await;
        tables
            .posts
            .get(&post_id)
            .map(|post| tables.record(post))
            .transpose()
    }

    async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        if tables.posts.remove(&post_id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.post_id != post_id);
        Ok(true)
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<usize> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .values()
            .filter(|post| tables.matches(post, filter))
            .count())
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PostRecord>> {
        let tables = self.tables.read().await;
        tables
            .filtered(filter)
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|post| tables.record(post))
            .collect()
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(AppError::BadRequest(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }

        let comment = Comment {
            id: Tables::next_id(&mut tables.next_comment_id),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRecord>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        comments
            .into_iter()
            .map(|comment| {
                let author = tables.users.get(&comment.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!(
                        "comment {} references a missing author",
                        comment.id
                    ))
                })?;
                Ok(CommentRecord {
                    comment: comment.clone(),
                    author,
                })
            })
            .collect()
    }

    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }

        let mut tables = self.tables.write().await;
        let exists = tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id);
        if exists {
            return Ok(false);
        }

        let follow = Follow {
            id: Tables::next_id(&mut tables.next_follow_id),
            user_id,
            author_id,
        };
        tables.follows.insert(follow.id, follow);
        Ok(true)
    }

    async fn unfollow(&self, user_id: Uuid, author_username: &str) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let author_id = match tables.users.values().find(|u| u.username == author_username) {
            Some(author) => author.id,
            None => return Ok(0),
        };

        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok((before - tables.follows.len()) as u64)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn followers_of(&self, author_id: Uuid) -> Result<Vec<FollowRecord>> {
        let tables = self.tables.read().await;
        tables
            .follows
            .values()
            .filter(|f| f.author_id == author_id)
            .map(|follow| {
                let user = tables.users.get(&follow.user_id).cloned();
                let author = tables.users.get(&follow.author_id).cloned();
                match (user, author) {
                    (Some(user), Some(author)) => Ok(FollowRecord {
                        follow: follow.clone(),
                        user,
                        author,
                    }),
                    _ => Err(AppError::Internal(format!(
                        "follow {} references a missing user",
                        follow.id
                    ))),
                }
            })
            .collect()
    }
}
