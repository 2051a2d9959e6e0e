//! Access token management
//!
//! Owns the bearer token used for every request. Expiry is not tracked here:
//! the transport notices an expired token from the server's answer and asks
//! for a refresh.

use qiita_core::dto::auth::{AuthenticateRequest, TokenResponse};
use reqwest::{Client, StatusCode};
use std::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ClientError, Result, is_connection_failure};

/// Holds the client credentials and the current access token
#[derive(Debug)]
pub struct TokenManager {
    client: Client,
    authenticate_url: String,
    client_id: String,
    client_secret: String,
    token: RwLock<String>,
}

impl TokenManager {
    /// Authenticates against the server and stores the first token
    ///
    /// # Arguments
    /// * `client` - HTTP client shared with the transport (carries TLS settings)
    /// * `server_url` - Base URL of the Qiita server
    /// * `client_id` - OAuth2 client id
    /// * `client_secret` - OAuth2 client secret
    ///
    /// # Errors
    /// [`ClientError::Authentication`] when the server rejects the
    /// credentials, an unreachable [`ClientError::RequestFailed`] when it
    /// cannot be reached.
    pub async fn acquire(
        client: Client,
        server_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        let authenticate_url = format!("{}/authenticate/", server_url);

        let token = fetch_token(&client, &authenticate_url, &client_id, &client_secret).await?;
        info!("Authenticated with the Qiita server as {}", client_id);

        Ok(Self {
            client,
            authenticate_url,
            client_id,
            client_secret,
            token: RwLock::new(token),
        })
    }

    /// Returns the current access token
    pub fn current(&self) -> String {
        match self.token.read() {
            Ok(token) => token.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Fetches a new token and replaces the stored one
    pub async fn refresh(&self) -> Result<()> {
        debug!("Refreshing access token");
        let token = fetch_token(
            &self.client,
            &self.authenticate_url,
            &self.client_id,
            &self.client_secret,
        )
        .await?;

        let mut current = match self.token.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *current = token;
        Ok(())
    }
}

async fn fetch_token(
    client: &Client,
    authenticate_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<String> {
    let response = client
        .post(authenticate_url)
        .form(&AuthenticateRequest::client(client_id, client_secret))
        .send()
        .await
        .map_err(|e| {
            if is_connection_failure(&e) {
                ClientError::request_failed("POST", "/authenticate/", None, e.to_string())
            } else {
                ClientError::Authentication(e.to_string())
            }
        })?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Authentication(format!(
            "status {}: {}",
            status.as_u16(),
            body
        )));
    }

    let token = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| ClientError::Authentication(format!("invalid token response: {}", e)))?;

    Ok(token.access_token)
}
