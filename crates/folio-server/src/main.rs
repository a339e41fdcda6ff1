mod auth;
mod blogs;
mod error;
mod interactions;
mod middleware;
mod notifications;
mod reports;
mod social;
mod users;
mod view;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use folio_db::Database;
use folio_media::{MediaStorage, MediaStore};

use crate::auth::AppState;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio=debug,folio_db=debug,folio_media=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = std::env::var("FOLIO_JWT_SECRET").unwrap_or_default();
    if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
        eprintln!("FATAL: FOLIO_JWT_SECRET is unset or still a placeholder.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("FOLIO_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FOLIO_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("FOLIO_DB_PATH")
        .unwrap_or_else(|_| "folio.db".into())
        .into();
    let upload_dir: PathBuf = std::env::var("FOLIO_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let public_base_url = std::env::var("FOLIO_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{port}"));

    // Init DB and media storage
    let db = Arc::new(Database::open(&db_path)?);
    let storage = MediaStorage::new(upload_dir.clone(), public_base_url).await?;
    let media = MediaStore::new(db.clone(), storage);

    let state = AppState {
        db,
        media,
        jwt_secret,
    };

    // CORS — permissive; the API is consumed from browser clients on
    // arbitrary origins.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let protected = Router::new()
        .route("/blogs", post(blogs::create_blog))
        .route("/blogs/with-media", post(blogs::create_blog_with_media))
        .route("/blogs/mine", get(blogs::my_blogs))
        .route("/blogs/mine/count", get(blogs::my_blog_count))
        .route("/blogs/{id}", get(blogs::get_blog))
        .route("/blogs/{id}", patch(blogs::update_blog))
        .route("/blogs/{id}", delete(blogs::delete_blog))
        .route("/blogs/{id}/status", put(blogs::set_blog_status))
        .route("/blogs/{id}/media", get(blogs::list_media))
        .route("/blogs/{id}/media", post(blogs::upload_media))
        .route("/blogs/{id}/like", post(interactions::like_blog))
        .route("/blogs/{id}/like", delete(interactions::unlike_blog))
        .route("/blogs/{id}/like", get(interactions::like_status))
        .route("/blogs/{id}/comments", post(interactions::add_comment))
        .route("/blogs/{id}/comments", get(interactions::list_comments))
        .route("/comments/{id}", delete(interactions::delete_comment))
        .route("/feed", get(blogs::feed))
        .route("/users/{id}/follow", post(social::follow_user))
        .route("/users/{id}/follow", delete(social::unfollow_user))
        .route("/users/{id}/follow-counts", get(social::follow_counts))
        .route("/users/{id}", delete(users::delete_user))
        .route("/media/{id}", delete(blogs::delete_media))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/unread-count", get(notifications::unread_count))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/reports", post(reports::create_report))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    let app = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .merge(protected)
        .layer(DefaultBodyLimit::max(12 * 1024 * 1024)) // media cap is 10 MB
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Folio listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// GET /health — liveness check (no auth).
async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
