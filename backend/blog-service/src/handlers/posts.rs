/// Post handlers - feeds, detail and the authoring forms
use crate::cache::INDEX_CACHE_KEY;
use crate::error::{AppError, Result};
use crate::forms::{clean_post, CommentFormView, ImageChange, PostFormView, PostSubmission};
use crate::handlers::{
    json_page, post_url, profile_url, redirect, render, render_body, AppState, CommentView,
    FollowView,
};
use crate::metrics::blog::{POSTS_CREATED_TOTAL, POSTS_EDITED_TOTAL};
use crate::middleware::{check_post_edit, CurrentUser, Viewer};
use crate::models::{NewPost, PostChanges, PostFilter, PostRecord};
use crate::pagination::PageQuery;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{debug, info};

async fn find_post(state: &AppState, post_id: i64) -> Result<PostRecord> {
    state
        .store
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

/// Landing feed of every post
///
/// The whole rendered body is cached under one fixed key, so every page
/// number and every visitor gets the same body until the entry expires.
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let body = state
        .page_cache
        .get_or_render(INDEX_CACHE_KEY, state.settings.index_cache_ttl(), || async {
            let page_obj = state.paginate(PostFilter::All, &query).await?;
            render_body(&json!({ "page_obj": page_obj }))
        })
        .await?;

    Ok(json_page(body))
}

pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let group = state
        .store
        .get_group_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;

    let page_obj = state.paginate(PostFilter::Group(group.id), &query).await?;

    render(&json!({
        "group": group,
        "page_obj": page_obj,
    }))
}

pub async fn profile(
    state: web::Data<AppState>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let author = state
        .store
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

    let page_obj = state.paginate(PostFilter::Author(author.id), &query).await?;

    let followers: Vec<FollowView> = state
        .store
        .followers_of(author.id)
        .await?
        .into_iter()
        .map(FollowView::from)
        .collect();

    let following = match viewer.user() {
        Some(user) => state.store.is_following(user.id, author.id).await?,
        None => false,
    };

    render(&json!({
        "author": author,
        "posts_count": page_obj.count,
        "followers": followers,
        "following": following,
        "page_obj": page_obj,
    }))
}

pub async fn post_detail(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let record = find_post(&state, *post_id).await?;

    let posts_count = state
        .store
        .count_posts(PostFilter::Author(record.author.id))
        .await?;

    let comments: Vec<CommentView> = state
        .store
        .list_comments(record.post.id)
        .await?
        .into_iter()
        .map(CommentView::from)
        .collect();

    // Only logged-in visitors get a comment form
    let form = viewer.user().map(|_| CommentFormView::default());

    render(&json!({
        "post": state.post_view(record),
        "comments": comments,
        "form": form,
        "posts_count": posts_count,
    }))
}

pub async fn post_create_form(
    state: web::Data<AppState>,
    _user: CurrentUser,
) -> Result<HttpResponse> {
    let groups = state.store.list_groups().await?;

    render(&json!({
        "form": PostFormView::empty(&groups),
        "is_edit": false,
    }))
}

pub async fn post_create(
    state: web::Data<AppState>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let CurrentUser(user) = user;
    let submission = PostSubmission::from_multipart(payload).await?;
    let groups = state.store.list_groups().await?;

    let clean = match clean_post(&submission, &groups) {
        Ok(clean) => clean,
        Err(errors) => {
            debug!(author = %user.username, ?errors, "Rejected new post");
            return render(&json!({
                "form": PostFormView::rejected(&submission, None, &groups, errors),
                "is_edit": false,
            }));
        }
    };

    let image = match clean.image {
        ImageChange::Replace(upload) => {
            Some(state.media.save(&upload.file_name, &upload.data).await?)
        }
        ImageChange::Keep | ImageChange::Clear => None,
    };

    let post = state
        .store
        .create_post(NewPost {
            text: clean.text,
            author_id: user.id,
            group_id: clean.group_id,
            image,
        })
        .await?;

    POSTS_CREATED_TOTAL.inc();
    info!(post_id = post.id, author = %user.username, "Post created");

    Ok(redirect(profile_url(&user.username)))
}

pub async fn post_edit_form(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    user: CurrentUser,
) -> Result<HttpResponse> {
    let record = find_post(&state, *post_id).await?;
    if !check_post_edit(&user.0, &record.post).is_allowed() {
        return Ok(redirect(post_url(record.post.id)));
    }

    let groups = state.store.list_groups().await?;
    let form = PostFormView::for_post(&record.post, &groups);

    render(&json!({
        "form": form,
        "is_edit": true,
        "post": state.post_view(record),
    }))
}

pub async fn post_edit(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    user: CurrentUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let CurrentUser(user) = user;
    let post_id = post_id.into_inner();
    let record = find_post(&state, post_id).await?;

    if !check_post_edit(&user, &record.post).is_allowed() {
        debug!(post_id, user = %user.username, "Edit denied, not the author");
        return Ok(redirect(post_url(post_id)));
    }

    let submission = PostSubmission::from_multipart(payload).await?;
    let groups = state.store.list_groups().await?;

    let clean = match clean_post(&submission, &groups) {
        Ok(clean) => clean,
        Err(errors) => {
            debug!(post_id, ?errors, "Rejected post edit");
            let form = PostFormView::rejected(
                &submission,
                record.post.image.clone(),
                &groups,
                errors,
            );
            return render(&json!({
                "form": form,
                "is_edit": true,
                "post": state.post_view(record),
            }));
        }
    };

    let image = match clean.image {
        ImageChange::Keep => record.post.image.clone(),
        ImageChange::Clear => None,
        ImageChange::Replace(upload) => {
            Some(state.media.save(&upload.file_name, &upload.data).await?)
        }
    };

    state
        .store
        .update_post(
            post_id,
            PostChanges {
                text: clean.text,
                group_id: clean.group_id,
                image,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    POSTS_EDITED_TOTAL.inc();
    info!(post_id, author = %user.username, "Post updated");

    Ok(redirect(post_url(post_id)))
}
