use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use axum_prometheus::PrometheusMetricLayer;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use devshelf_server::config::Config;
use devshelf_server::state::AppState;
use devshelf_server::{db, handlers};

#[tokio::main]
async fn main() {
    // Initialize tracing — JSON in production, human-readable in dev.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "devshelf_server=info,tower_http=info,sqlx=warn"
            .parse()
            .unwrap()
    });

    if std::env::var("APP_ENV").as_deref() == Ok("production") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("🚀 Devshelf Server starting...");

    let config = Config::from_env().expect("Failed to load configuration");
    info!("📝 Configuration loaded");

    // Create database connection pool
    let pool = db::create_pool(&config.database_url, &config.database)
        .await
        .expect("Failed to create database pool");

    // Auto-run pending migrations on startup.
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    info!("✅ Database migrations applied");

    db::health_check(&pool)
        .await
        .expect("Database health check failed");
    info!("✅ Database health check passed");

    // CORS: permissive in dev, restrictive in production.
    let cors = if config.is_dev {
        info!("🔓 CORS: permissive (dev mode)");
        CorsLayer::permissive()
    } else {
        tracing::warn!("🔒 CORS: restrictive (production mode)");
        CorsLayer::new()
    };

    if config.metadata.block_private_addresses {
        info!("🛡️ Metadata fetches to private addresses are blocked");
    } else {
        tracing::warn!(
            "Metadata fetches are unrestricted (SSRF exposure). \
             Set BLOCK_PRIVATE_ADDRESSES=true to refuse private destinations."
        );
    }

    let addr = config.server_addr();

    // One shared outbound client; per-request timeouts come from settings.
    let http_client = reqwest::Client::builder()
        .user_agent(handlers::metadata::USER_AGENT)
        .build()
        .expect("Failed to build HTTP client");

    let app_state = AppState {
        pool,
        jwt_secret: Arc::from(config.jwt_secret.as_str()),
        http_client,
        metadata: config.metadata.clone(),
    };

    // Prometheus metrics layer
    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    // Build router
    let app = Router::new()
        // Health check + metrics
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(move || async move { metric_handle.render() }),
        )
        // Auth routes
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/users/@me", get(handlers::users::get_current_user))
        // Metadata extraction (protected)
        .route("/api/fetchMetadata", get(handlers::metadata::fetch_metadata))
        // Bookmark routes (protected)
        .route("/bookmarks", post(handlers::bookmarks::create_bookmark))
        .route("/bookmarks", get(handlers::bookmarks::list_bookmarks))
        .route(
            "/bookmarks/metadata",
            get(handlers::metadata::hydrate_bookmarks),
        )
        .route(
            "/bookmarks/by-url",
            delete(handlers::bookmarks::delete_bookmark_by_url),
        )
        .route("/bookmarks/:id", patch(handlers::bookmarks::update_bookmark))
        .route(
            "/bookmarks/:id",
            delete(handlers::bookmarks::delete_bookmark),
        )
        // Project routes (protected)
        .route("/projects", post(handlers::projects::create_project))
        .route("/projects", get(handlers::projects::list_projects))
        .route("/projects/:id", patch(handlers::projects::update_project))
        .route("/projects/:id", delete(handlers::projects::delete_project))
        .route(
            "/projects/:id/bookmarks",
            post(handlers::projects::link_bookmark),
        )
        .route(
            "/projects/:id/bookmarks",
            get(handlers::projects::list_project_bookmarks),
        )
        .route(
            "/projects/:id/bookmarks/:bookmark_id",
            delete(handlers::projects::unlink_bookmark),
        )
        .route(
            "/project-bookmarks",
            get(handlers::projects::list_all_associations),
        )
        // Middleware
        .layer(prometheus_layer)
        .layer(cors)
        .with_state(app_state);

    info!("🎧 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
