/// Blog Service Library
///
/// A small blogging service: authors write posts, optionally file them under
/// topical groups, comment on each other's posts and follow authors to get a
/// personalized feed.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers, one per view
/// - `routes`: route table shared by the server and the tests
/// - `models`: users, groups, posts, comments and follows
/// - `db`: the `BlogStore` trait with PostgreSQL and in-memory implementations
/// - `cache`: rendered-page cache for the landing feed
/// - `forms`: form binding and validation
/// - `media`: storage for uploaded post images
/// - `middleware`: session resolution, login redirects and edit permissions
/// - `pagination`: page slicing for every feed
/// - `error`: Error types and handling
/// - `config`: Configuration management
/// - `metrics`: Prometheus collectors and the `/metrics` endpoint
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod media;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod routes;

pub use config::Config;
pub use error::{AppError, Result};
