/// Authorization checks for blog content
///
/// A denied edit is not an error: the edit view answers it with a silent
/// redirect to the post, so the outcome is an explicit value.
use crate::models::{Post, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPermission {
    Allowed,
    Denied,
}

impl EditPermission {
    pub fn is_allowed(self) -> bool {
        matches!(self, EditPermission::Allowed)
    }
}

/// Only the author may edit a post
pub fn check_post_edit(user: &User, post: &Post) -> EditPermission {
    if post.author_id == user.id {
        EditPermission::Allowed
    } else {
        EditPermission::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
        }
    }

    fn post_by(author: &User) -> Post {
        Post {
            id: 1,
            text: "text".to_string(),
            created_at: Utc::now(),
            author_id: author.id,
            group_id: None,
            image: None,
        }
    }

    #[test]
    fn author_may_edit() {
        let author = user("author");
        assert_eq!(
            check_post_edit(&author, &post_by(&author)),
            EditPermission::Allowed
        );
    }

    #[test]
    fn others_are_denied() {
        let author = user("author");
        let other = user("other");
        let permission = check_post_edit(&other, &post_by(&author));
        assert_eq!(permission, EditPermission::Denied);
        assert!(!permission.is_allowed());
    }
}
