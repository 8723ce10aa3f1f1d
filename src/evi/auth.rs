use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Exchange an API key / secret key pair for a short-lived access token
/// (OAuth client-credentials grant).
pub async fn fetch_access_token(token_url: &str, api_key: &str, secret_key: &str) -> Result<String> {
    info!("Requesting EVI access token from {}", token_url);

    let response = reqwest::Client::new()
        .post(token_url)
        .basic_auth(api_key, Some(secret_key))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await
        .context("Failed to reach token endpoint")?
        .error_for_status()
        .context("Token request rejected")?;

    let token: TokenResponse = response
        .json()
        .await
        .context("Malformed token response")?;

    info!("Access token acquired");

    Ok(token.access_token)
}
