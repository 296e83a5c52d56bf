use std::sync::Arc;

use crate::{
    api::AppState, config::AppConfig, error, fetcher::YtDlpFetcher, info, server, warning,
};

pub async fn serve(config: AppConfig) {
    if config.spotify.client_id.is_none() {
        warning!("SPOTIFY_API_AUTH_CLIENT_ID is not set, Spotify login is disabled.");
    }

    info!("Starting server on {}", config.server_addr);

    let fetcher = Arc::new(YtDlpFetcher::from_config(&config));
    let state = AppState::new(config, fetcher);

    if let Err(e) = server::start_api_server(state).await {
        error!("Server stopped. Err: {}", e);
    }
}
