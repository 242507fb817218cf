/// Comment handlers
///
/// Comment submission never renders anything: valid or not, the visitor is
/// sent back to the post.
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, MAX_FORM_BYTES};
use crate::handlers::{post_url, redirect, AppState};
use crate::metrics::blog::COMMENTS_CREATED_TOTAL;
use crate::middleware::CurrentUser;
use crate::models::NewComment;
use actix_web::error::UrlencodedError;
use actix_web::{web, HttpResponse};
use tracing::{debug, info};

/// Add a comment to a post
///
/// `GET` on the same route lands here with no form and just redirects. A body
/// over the form size limit is rejected instead of being treated as empty.
pub async fn add_comment(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    user: CurrentUser,
    form: std::result::Result<web::Form<CommentForm>, actix_web::Error>,
) -> Result<HttpResponse> {
    let CurrentUser(user) = user;
    let post_id = post_id.into_inner();

    let post = state
        .store
        .get_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    let form = match form {
        Ok(form) => Some(form.into_inner()),
        Err(e)
            if matches!(
                e.as_error::<UrlencodedError>(),
                Some(UrlencodedError::Overflow { .. })
            ) =>
        {
            return Err(AppError::BadRequest(format!(
                "comment body exceeds {} bytes",
                MAX_FORM_BYTES
            )));
        }
        Err(_) => None,
    };

    match form.and_then(CommentForm::clean) {
        Some(text) => {
            let comment = state
                .store
                .create_comment(NewComment {
                    post_id: post.post.id,
                    author_id: user.id,
                    text,
                })
                .await?;

            COMMENTS_CREATED_TOTAL.inc();
            info!(
                comment_id = comment.id,
                post_id,
                author = %user.username,
                "Comment created"
            );
        }
        None => debug!(post_id, user = %user.username, "Ignored invalid comment"),
    }

    Ok(redirect(post_url(post_id)))
}
