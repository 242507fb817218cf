//! Prometheus metrics for blog-service.
//!
//! Exposes write-path collectors and an HTTP handler for the `/metrics` endpoint.
//! Page cache counters live next to the cache itself.

use actix_web::HttpResponse;
use prometheus::{Encoder, TextEncoder};

pub mod blog;

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
