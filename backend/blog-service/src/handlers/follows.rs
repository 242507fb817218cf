/// Follow handlers - personalized feed and follow/unfollow actions
use crate::error::{AppError, Result};
use crate::handlers::{profile_url, redirect, render, AppState};
use crate::metrics::blog::FOLLOW_CHANGES_TOTAL;
use crate::middleware::CurrentUser;
use crate::models::PostFilter;
use crate::pagination::PageQuery;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

/// Posts by every author the current user follows
pub async fn follow_index(
    state: web::Data<AppState>,
    user: CurrentUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page_obj = state
        .paginate(PostFilter::FollowedBy(user.0.id), &query)
        .await?;

    render(&json!({ "page_obj": page_obj }))
}

/// Follow an author; repeating it or following yourself changes nothing
pub async fn profile_follow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let CurrentUser(user) = user;
    let author = state
        .store
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

    if state.store.follow(user.id, author.id).await? {
        FOLLOW_CHANGES_TOTAL.with_label_values(&["follow"]).inc();
        info!(user = %user.username, author = %author.username, "Followed author");
    }

    Ok(redirect(profile_url(&author.username)))
}

/// Unfollow an author by name; an unknown name is not an error here
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let CurrentUser(user) = user;
    let removed = state.store.unfollow(user.id, &username).await?;

    if removed > 0 {
        FOLLOW_CHANGES_TOTAL.with_label_values(&["unfollow"]).inc();
        info!(user = %user.username, author = %username, "Unfollowed author");
    }

    Ok(redirect(profile_url(&username)))
}
