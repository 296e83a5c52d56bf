use axum::{
    extract::{Query, State},
    response::Redirect,
};
use serde::Deserialize;

use crate::{spotify, utils};

use super::{
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// GET /api/auth/spotify/login
/// Redirect the browser to Spotify's consent page.
pub async fn login(State(state): State<AppState>) -> ApiResult<Redirect> {
    let (oauth_state, verifier) = state.logins.begin();
    let challenge = utils::generate_code_challenge(&verifier);
    let url = spotify::auth::authorize_url(&state.config.spotify, &oauth_state, &challenge)?;
    Ok(Redirect::temporary(&url))
}

/// GET /api/auth/spotify/callback
/// Finish the login and hand the access token to the frontend.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Redirect> {
    if let Some(error) = params.error {
        return Err(ApiError::Unauthorized(format!("Spotify login failed: {}", error)));
    }
    let code = params
        .code
        .ok_or_else(|| ApiError::Validation("missing code".to_string()))?;
    let verifier = params
        .state
        .as_deref()
        .and_then(|s| state.logins.take(s))
        .ok_or_else(|| ApiError::Validation("unknown or expired login state".to_string()))?;

    let token =
        spotify::auth::exchange_code(&state.http, &state.config.spotify, &code, &verifier).await?;
    tracing::info!("spotify login completed");

    let url = spotify::auth::frontend_redirect(&state.config.spotify, &token)?;
    Ok(Redirect::temporary(&url))
}
