/// Route table
///
/// Paths are registered with a trailing slash; the server wraps the app in
/// `NormalizePath` so `/posts/1` and `/posts/1/` reach the same handler.
use crate::error::{AppError, Result};
use crate::forms::MAX_FORM_BYTES;
use crate::handlers;
use crate::metrics::serve_metrics;
use actix_web::{web, HttpRequest, HttpResponse};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(MAX_FORM_BYTES))
        .route("/", web::get().to(handlers::index))
        .route("/group/{slug}/", web::get().to(handlers::group_posts))
        .route("/profile/{username}/", web::get().to(handlers::profile))
        .service(
            web::resource("/profile/{username}/follow/")
                .route(web::get().to(handlers::profile_follow))
                .route(web::post().to(handlers::profile_follow)),
        )
        .service(
            web::resource("/profile/{username}/unfollow/")
                .route(web::get().to(handlers::profile_unfollow))
                .route(web::post().to(handlers::profile_unfollow)),
        )
        .route("/follow/", web::get().to(handlers::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(handlers::post_create_form))
                .route(web::post().to(handlers::post_create)),
        )
        .route("/posts/{post_id}/", web::get().to(handlers::post_detail))
        .service(
            web::resource("/posts/{post_id}/edit/")
                .route(web::get().to(handlers::post_edit_form))
                .route(web::post().to(handlers::post_edit)),
        )
        .service(
            web::resource("/posts/{post_id}/comment/")
                .route(web::get().to(handlers::add_comment))
                .route(web::post().to(handlers::add_comment)),
        )
        .route("/about/author/", web::get().to(handlers::about_author))
        .route("/about/tech/", web::get().to(handlers::about_tech))
        .route("/health/", web::get().to(handlers::health_summary))
        .route("/health/live/", web::get().to(handlers::liveness_check))
        .route("/health/ready/", web::get().to(handlers::readiness_summary))
        .route("/metrics/", web::get().to(serve_metrics));
}

/// Fallback for unmatched paths
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse> {
    Err(AppError::NotFound(format!("page '{}'", req.path())))
}
