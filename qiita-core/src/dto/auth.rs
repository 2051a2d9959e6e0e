//! Authentication DTOs

use serde::{Deserialize, Serialize};

/// Error description the server sends when a bearer token has expired
pub const TOKEN_EXPIRED_DESCRIPTION: &str = "Oauth2 error: token has timed out";

/// Form body of `POST /authenticate/`
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticateRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub grant_type: &'static str,
}

impl<'a> AuthenticateRequest<'a> {
    pub fn client(client_id: &'a str, client_secret: &'a str) -> Self {
        Self {
            client_id,
            client_secret,
            grant_type: "client",
        }
    }
}

/// Successful authentication response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

/// OAuth2 error body returned alongside 400 responses
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthError {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Returns true when a 400 response body reports an expired token
pub fn is_token_expired(body: &str) -> bool {
    serde_json::from_str::<OAuthError>(body)
        .ok()
        .and_then(|err| err.error_description)
        .is_some_and(|description| description == TOKEN_EXPIRED_DESCRIPTION)
}
