use actix_web::middleware::{NormalizePath, TrailingSlash};
use actix_web::{web, App, HttpServer};
use anyhow::{bail, Context};
use blog_service::cache::PageCache;
use blog_service::db::{self, BlogStore, PgBlogStore};
use blog_service::handlers::AppState;
use blog_service::media::LocalMediaStorage;
use blog_service::middleware::{SessionKeys, SessionMiddleware};
use blog_service::models::NewGroup;
use blog_service::{routes, Config};
use std::io;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: blog-service [create-user <username> | \
create-group <slug> <title> [description] | issue-session <username> | healthcheck]";

/// Blog Service
///
/// Serves the blog views over HTTP. Operator subcommands seed users and
/// groups and mint session tokens for the external login flow:
///
/// - `create-user <username>`
/// - `create-group <slug> <title> [description]`
/// - `issue-session <username>`
/// - `healthcheck` (container probe against the running server)
#[actix_web::main]
async fn main() -> io::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.first().map(String::as_str) == Some("healthcheck") {
        return healthcheck().await;
    }

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if !args.is_empty() {
        return run_command(&config, &args)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("{:#}", e)));
    }

    serve(config).await
}

async fn serve(config: Config) -> io::Result<()> {
    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let pool = match db::create_pool(&config.database).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::migrate(&pool).await {
        tracing::error!("Database migration failed: {:#}", e);
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("Failed to run migrations: {e}"),
        ));
    }

    let store: Arc<dyn BlogStore> = Arc::new(PgBlogStore::new(pool));
    let session_keys = Arc::new(SessionKeys::from_config(&config.session));
    let state = web::Data::new(AppState {
        store: store.clone(),
        page_cache: Arc::new(PageCache::new()),
        media: Arc::new(LocalMediaStorage::new(
            config.media.root.clone(),
            config.media.url.clone(),
        )),
        settings: config.blog.clone(),
    });

    let bind_address = config.bind_address();
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware::new(session_keys.clone(), store.clone()))
            .wrap(NormalizePath::new(TrailingSlash::Always))
            .wrap(TracingLogger::default())
            .configure(routes::configure)
            .default_service(web::to(routes::not_found))
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();

    tokio::select! {
        result = server => {
            if let Err(e) = &result {
                tracing::error!("HTTP server error: {}", e);
            }
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("blog-service stopped");
    Ok(())
}

/// Operator subcommands; each runs against the configured database
async fn run_command(config: &Config, args: &[String]) -> anyhow::Result<()> {
    let pool = db::create_pool(&config.database)
        .await
        .context("failed to connect to the database")?;
    db::migrate(&pool)
        .await
        .context("failed to run migrations")?;
    let store = PgBlogStore::new(pool);

    match args {
        [command, username] if command == "create-user" => {
            let user = store.create_user(username).await?;
            tracing::info!(user_id = %user.id, username = %user.username, "User created");
            println!("{}", user.id);
        }
        [command, slug, title, rest @ ..] if command == "create-group" && rest.len() <= 1 => {
            let group = store
                .create_group(NewGroup {
                    title: title.clone(),
                    slug: slug.clone(),
                    description: rest.first().cloned().unwrap_or_default(),
                })
                .await?;
            tracing::info!(group_id = group.id, slug = %group.slug, "Group created");
            println!("{}", group.id);
        }
        [command, username] if command == "issue-session" => {
            let user = store
                .get_user_by_username(username)
                .await?
                .with_context(|| format!("unknown user '{}'", username))?;
            let keys = SessionKeys::from_config(&config.session);
            println!("{}={}", keys.cookie_name(), keys.issue(&user)?);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}

async fn healthcheck() -> io::Result<()> {
    let port = std::env::var("BLOG_SERVICE_PORT").unwrap_or_else(|_| "8080".to_string());
    let url = format!("http://127.0.0.1:{}/health/", port);

    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            eprintln!("healthcheck HTTP status: {}", resp.status());
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"))
        }
        Err(e) => {
            eprintln!("healthcheck HTTP error: {}", e);
            Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"))
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
