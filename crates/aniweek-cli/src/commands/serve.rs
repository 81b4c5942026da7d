use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use color_eyre::Result;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use aniweek_anilist::{AniListClient, FetchError, ScheduleSource};
use aniweek_config::ServerConfig;
use aniweek_core::{group_and_merge, WeekCache};

use crate::output::Output;

#[derive(Clone)]
struct AppState {
    cache: WeekCache,
    source: Arc<dyn ScheduleSource>,
    server: ServerConfig,
}

#[derive(Deserialize)]
struct ScheduleParams {
    #[serde(default)]
    offset: i32,
    #[serde(default)]
    refresh: bool,
}

pub async fn run_serve(bind_override: Option<String>, output: &Output) -> Result<()> {
    let config = super::config::load_config()?;
    let tz = config
        .schedule
        .tz()
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let client = AniListClient::from_config(&config.anilist)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to build AniList client: {}", e))?;
    let source: Arc<dyn ScheduleSource> = Arc::new(client);
    let cache = WeekCache::new(Arc::clone(&source), tz, &config.schedule);

    let bind = bind_override.unwrap_or_else(|| config.server.bind.clone());
    let state = AppState {
        cache,
        source,
        server: config.server,
    };

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to bind {}: {}", bind, e))?;
    let addr = listener
        .local_addr()
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
    info!("Listening on {}", addr);
    output.info(&format!("Serving schedule API on http://{}", addr));

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Server error: {}", e))?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutting down");
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/schedule", get(get_schedule))
        .route("/api/anime/:id", get(get_anime))
        .route("/health", get(health))
        .with_state(state)
}

async fn get_schedule(
    State(state): State<AppState>,
    Query(params): Query<ScheduleParams>,
) -> Response {
    let range = state.cache.week_range();
    if params.offset < -range || params.offset > range {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": format!("offset must be between -{} and {}", range, range)
            })),
        )
            .into_response();
    }

    let result = if params.refresh {
        state.cache.refresh_week(params.offset).await
    } else {
        state.cache.get_week(params.offset).await
    };

    match result {
        Ok(week) => {
            let data = group_and_merge(&week.entries, week.week_start, state.cache.tz());
            let cache_control = format!(
                "public, s-maxage={}, stale-while-revalidate={}",
                state.server.cache_max_age_secs, state.server.cache_stale_secs
            );
            ([(header::CACHE_CONTROL, cache_control)], Json(data)).into_response()
        }
        Err(e) => fetch_error_response(e),
    }
}

async fn get_anime(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match state.source.fetch_media(id).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => fetch_error_response(e),
    }
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "cachedWeeks": state.cache.cached_weeks().await,
    }))
}

fn fetch_error_response(err: FetchError) -> Response {
    let status = match &err {
        FetchError::NotFound(_) => StatusCode::NOT_FOUND,
        FetchError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::BAD_GATEWAY,
    };
    error!("Request failed: {}", err);
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}
