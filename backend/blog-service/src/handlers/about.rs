/// Static "about" pages
use crate::error::Result;
use crate::handlers::render;
use actix_web::HttpResponse;
use serde_json::json;

pub async fn about_author() -> Result<HttpResponse> {
    render(&json!({ "page": "author" }))
}

pub async fn about_tech() -> Result<HttpResponse> {
    render(&json!({ "page": "tech" }))
}
