use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::{net::SocketAddr, str::FromStr};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{Res, api, api::AppState};

/// Builds the application router with all endpoints.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/search", post(api::search))
        .route("/download", post(api::download))
        .route("/progress/{job_id}", get(api::progress))
        .route("/auth/spotify/login", get(api::login))
        .route("/auth/spotify/callback", get(api::callback))
        .route("/spotify/playlists", get(api::list_playlists))
        .route(
            "/spotify/playlists/{playlist_id}/tracks",
            get(api::list_playlist_tracks),
        );

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Binds the configured address and serves the API until the process
/// stops. Also starts the sweeper that evicts finished jobs.
pub async fn start_api_server(state: AppState) -> Res<()> {
    let addr = SocketAddr::from_str(&state.config.server_addr)
        .map_err(|e| format!("Failed to parse server address: {}", e))?;

    async_fs::create_dir_all(&state.config.downloads_dir).await?;

    let sweeper = state
        .registry
        .spawn_eviction(state.config.job_ttl, state.config.sweep_interval);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(
        "listening on {}, saving downloads to {}",
        addr,
        state.config.downloads_dir.display()
    );

    let result = axum::serve(listener, router(state)).await;
    sweeper.abort();
    result?;
    Ok(())
}
