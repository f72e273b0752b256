use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{
    cache::LeaderboardCache,
    config::Config,
    render::{self, PageContent},
    table::{TableQuery, TableView},
};

const FETCH_FAILED: &str = "Failed to fetch leaderboard data";

pub fn router(cache: Arc<LeaderboardCache>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/embed", get(embed))
        .route("/api/leaderboard", get(leaderboard))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(cache)
}

pub async fn serve(cfg: Config, cache: Arc<LeaderboardCache>) -> eyre::Result<()> {
    let addr = SocketAddr::new(cfg.bind_addr, cfg.port);
    info!("API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(cache).into_make_service()).await?;

    Ok(())
}

fn cache_control(cache: &LeaderboardCache) -> String {
    format!(
        "public, s-maxage={}, stale-while-revalidate={}",
        cache.fresh_window().as_secs(),
        cache.stale_window().as_secs()
    )
}

async fn leaderboard(State(cache): State<Arc<LeaderboardCache>>) -> Response {
    match cache.get().await {
        Ok(snapshot) => (
            [(header::CACHE_CONTROL, cache_control(&cache))],
            Json(&snapshot.entries),
        )
            .into_response(),
        Err(e) => {
            error!("❌ Leaderboard API failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": FETCH_FAILED })),
            )
                .into_response()
        }
    }
}

async fn index(
    State(cache): State<Arc<LeaderboardCache>>,
    Query(query): Query<TableQuery>,
) -> Response {
    let view = TableView::from_query(&query);
    match cache.get().await {
        Ok(snapshot) => Html(render::render_page(
            &view,
            PageContent::Ready {
                ranked: &snapshot.entries,
                generated_at: snapshot.generated_at,
            },
        ))
        .into_response(),
        Err(e) => {
            error!("❌ Leaderboard page failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render::render_page(&view, PageContent::Failed(FETCH_FAILED))),
            )
                .into_response()
        }
    }
}

async fn embed(
    State(cache): State<Arc<LeaderboardCache>>,
    Query(query): Query<TableQuery>,
) -> Response {
    let view = TableView::from_query(&query);
    match cache.get().await {
        Ok(snapshot) => Html(render::render_embed(
            &view,
            PageContent::Ready {
                ranked: &snapshot.entries,
                generated_at: snapshot.generated_at,
            },
        ))
        .into_response(),
        Err(e) => {
            error!("❌ Leaderboard embed failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(render::render_embed(&view, PageContent::Failed(FETCH_FAILED))),
            )
                .into_response()
        }
    }
}
