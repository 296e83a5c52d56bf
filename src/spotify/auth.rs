use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{config::SpotifyConfig, types::Token};

use super::{SpotifyError, upstream_error};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Builds the Spotify authorization URL for the PKCE authorization-code
/// flow.
///
/// # Arguments
///
/// * `config` - Spotify settings; `client_id` must be set
/// * `state` - Opaque value echoed back to the callback
/// * `code_challenge` - SHA256 challenge derived from the code verifier
///
/// # Errors
///
/// Returns [`SpotifyError::NotConfigured`] without a client id and
/// [`SpotifyError::InvalidUrl`] if the configured authorization endpoint is
/// not a URL.
pub fn authorize_url(
    config: &SpotifyConfig,
    state: &str,
    code_challenge: &str,
) -> Result<String, SpotifyError> {
    let client_id = config
        .client_id
        .as_deref()
        .ok_or(SpotifyError::NotConfigured("SPOTIFY_API_AUTH_CLIENT_ID"))?;

    let url = Url::parse_with_params(
        &config.auth_url,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", config.scope.as_str()),
            ("state", state),
            ("code_challenge_method", "S256"),
            ("code_challenge", code_challenge),
        ],
    )
    .map_err(|e| SpotifyError::InvalidUrl(e.to_string()))?;

    Ok(url.to_string())
}

/// Exchanges an authorization code for an access token.
///
/// The code verifier proves this backend started the flow. When a client
/// secret is configured it is sent as well, which Spotify requires for
/// confidential clients.
pub async fn exchange_code(
    client: &Client,
    config: &SpotifyConfig,
    code: &str,
    verifier: &str,
) -> Result<Token, SpotifyError> {
    let client_id = config
        .client_id
        .as_deref()
        .ok_or(SpotifyError::NotConfigured("SPOTIFY_API_AUTH_CLIENT_ID"))?;

    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", client_id),
        ("code_verifier", verifier),
    ];
    if let Some(secret) = config.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let response = client.post(&config.token_url).form(&form).send().await?;
    if !response.status().is_success() {
        return Err(upstream_error(response).await);
    }

    let token: TokenResponse = response.json().await?;
    Ok(Token {
        access_token: token.access_token,
        expires_in: token.expires_in.unwrap_or(3600),
    })
}

/// URL the browser is sent to after a successful login, carrying the access
/// token and its lifetime in seconds as query parameters.
pub fn frontend_redirect(config: &SpotifyConfig, token: &Token) -> Result<String, SpotifyError> {
    let expires_in = token.expires_in.to_string();
    Url::parse_with_params(
        &config.frontend_redirect,
        &[
            ("token", token.access_token.as_str()),
            ("expires_in", expires_in.as_str()),
        ],
    )
    .map(|url| url.to_string())
    .map_err(|e| SpotifyError::InvalidUrl(e.to_string()))
}
