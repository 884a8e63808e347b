use super::handlers::{
    handle_create_query, handle_delete_query, handle_get_query, handle_health,
    handle_list_queries, handle_user,
};
use super::{
    AppState, GeminiGenerator, MAX_BODY_SIZE, REQUEST_TIMEOUT_SECS, SqliteQueryStore,
    StaticSessionResolver, store,
};
use crate::config::Config;
use anyhow::{Context, Result};
use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    routing::get,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Bind `host:port` and serve until the process is stopped.
pub async fn run_server(host: &str, port: u16, config: &Config) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;

    let pool = store::connect(&config.database_url()).await?;
    let store = SqliteQueryStore::new(pool).await?;
    let generator = GeminiGenerator::new(&config.generation)?;
    if !generator.has_api_key() {
        tracing::warn!("no Gemini API key configured; POST /api/query will answer 502");
    }
    let sessions = StaticSessionResolver::from_config(&config.identity);
    if sessions.is_empty() {
        tracing::warn!("no identity sessions configured; every request will be unauthorized");
    }

    let state = AppState {
        store: Arc::new(store),
        generator: Arc::new(generator),
        sessions: Arc::new(sessions),
    };
    run_server_with_listener(listener, state, &config.server.cors_origins).await
}

/// Serve from a pre-bound listener.
pub async fn run_server_with_listener(
    listener: TcpListener,
    state: AppState,
    cors_origins: &[String],
) -> Result<()> {
    let addr = listener.local_addr()?;
    print_banner(&addr.to_string(), cors_origins);
    tracing::info!(%addr, "backend listening");

    axum::serve(listener, build_app(state, cors_origins)).await?;
    Ok(())
}

fn print_banner(display_addr: &str, cors_origins: &[String]) {
    println!("Lextro backend listening on {display_addr}");
    println!("  GET    /health");
    println!("  GET    /api/user");
    println!("  GET    /api/query[?id=]");
    println!("  POST   /api/query");
    println!("  GET    /api/query/{{id}}");
    println!("  DELETE /api/query/{{id}}");
    if cors_origins.is_empty() {
        println!("  CORS disabled");
    } else {
        println!("  CORS origins: {}", cors_origins.join(", "));
    }
}

pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let mut app = Router::new()
        .route("/health", get(handle_health))
        .route("/api/user", get(handle_user))
        .route(
            "/api/query",
            get(handle_list_queries).post(handle_create_query),
        )
        .route(
            "/api/query/{id}",
            get(handle_get_query).delete(handle_delete_query),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ));

    if !cors_origins.is_empty() {
        let origins: Vec<HeaderValue> = cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::DELETE])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                .allow_credentials(true),
        );
    }

    app
}
