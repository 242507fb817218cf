use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Posts written through the create form.
    pub static ref POSTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_posts_created_total",
        "Total number of posts created"
    )
    .expect("failed to register blog_posts_created_total");

    /// Post edits saved by their author.
    pub static ref POSTS_EDITED_TOTAL: IntCounter = register_int_counter!(
        "blog_posts_edited_total",
        "Total number of post edits saved"
    )
    .expect("failed to register blog_posts_edited_total");

    pub static ref COMMENTS_CREATED_TOTAL: IntCounter = register_int_counter!(
        "blog_comments_created_total",
        "Total number of comments created"
    )
    .expect("failed to register blog_comments_created_total");

    /// Follow graph changes (follow/unfollow) that actually touched a row.
    pub static ref FOLLOW_CHANGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blog_follow_changes_total",
        "Follow relationship changes segmented by action",
        &["action"]
    )
    .expect("failed to register blog_follow_changes_total");
}
