//! Request funnel
//!
//! All API calls go through [`QiitaClient::request_retry`], which layers two
//! retry policies:
//! - an outer loop of at most 2 attempts for requests that could not reach
//!   the server or came back with an unclassified status
//! - an inner one-shot resend after refreshing an expired token

use qiita_core::dto::auth::is_token_expired;
use qiita_core::dto::patch::{PatchOp, PatchRequest};
use reqwest::{Method, StatusCode};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::QiitaClient;
use crate::error::{ClientError, Result, is_connection_failure};

/// Total attempts of the outer retry loop
const MAX_ATTEMPTS: u32 = 2;

/// Body of an outgoing request
///
/// Kept separate from the reqwest builder so the same request can be rebuilt
/// for every resend.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(JsonValue),
    /// Flat object sent form-encoded
    Form(JsonValue),
}

/// Outcome of a single exchange with the server
enum Exchange {
    Response { status: StatusCode, text: String },
    Unreachable(String),
}

impl QiitaClient {
    // =============================================================================
    // Public verbs
    // =============================================================================

    /// Execute a GET request against the server
    ///
    /// # Arguments
    /// * `path` - The path to access, relative to the server URL
    ///
    /// # Returns
    /// The JSON body of the response, `None` when the body is empty
    pub async fn get(&self, path: &str) -> Result<Option<JsonValue>> {
        self.request_retry(Method::GET, path, &RequestBody::Empty)
            .await
    }

    /// Execute a POST request against the server
    ///
    /// # Arguments
    /// * `path` - The path to access, relative to the server URL
    /// * `body` - The request body
    pub async fn post(&self, path: &str, body: RequestBody) -> Result<Option<JsonValue>> {
        self.request_retry(Method::POST, path, &body).await
    }

    /// Execute a PATCH request against the server
    ///
    /// # Arguments
    /// * `path` - The path to access, relative to the server URL
    /// * `op` - The operation to perform
    /// * `json_path` - Target location within the endpoint
    /// * `value` - New value, required by `add`, `replace` and `test`
    /// * `from` - Source location, required by `move` and `copy`
    ///
    /// # Errors
    /// Fails with [`ClientError::InvalidArgument`] before any network call if
    /// a required parameter is missing.
    pub async fn patch(
        &self,
        path: &str,
        op: PatchOp,
        json_path: &str,
        value: Option<&str>,
        from: Option<&str>,
    ) -> Result<Option<JsonValue>> {
        if op.requires_value() && value.is_none() {
            return Err(ClientError::InvalidArgument(format!(
                "Operation '{}' requires the parameter 'value'",
                op
            )));
        }
        if op.requires_from() && from.is_none() {
            return Err(ClientError::InvalidArgument(format!(
                "Operation '{}' requires the parameter 'from'",
                op
            )));
        }

        let request = serde_json::to_value(PatchRequest {
            op,
            path: json_path.to_string(),
            value: value.map(str::to_string),
            from: from.map(str::to_string),
        })
        .map_err(|e| ClientError::Parse(e.to_string()))?;

        self.request_retry(Method::PATCH, path, &RequestBody::Form(request))
            .await
    }

    // =============================================================================
    // Retry routine
    // =============================================================================

    /// Execute a request, retrying it when the server cannot be reached
    ///
    /// 404, 403 and 400 are never retried. A 400 that reports an expired
    /// token has already been resent once by the inner exchange.
    async fn request_retry(
        &self,
        method: Method,
        path: &str,
        body: &RequestBody,
    ) -> Result<Option<JsonValue>> {
        let url = format!("{}{}", self.server_url, path);
        let mut last_status = None;
        let mut last_message = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.request_oauth2(&method, &url, body).await? {
                Exchange::Response { status, text } => match status {
                    StatusCode::NOT_FOUND => return Err(ClientError::NotFound(text)),
                    StatusCode::FORBIDDEN => return Err(ClientError::Forbidden(text)),
                    StatusCode::BAD_REQUEST => return Err(ClientError::BadRequest(text)),
                    StatusCode::OK => return Ok(parse_body(&text)),
                    other => {
                        warn!(
                            "{} {} returned {} (attempt {}/{})",
                            method, path, other, attempt, MAX_ATTEMPTS
                        );
                        last_status = Some(other.as_u16());
                        last_message = text;
                    }
                },
                Exchange::Unreachable(message) => {
                    warn!(
                        "{} {} could not reach the server (attempt {}/{}): {}",
                        method, path, attempt, MAX_ATTEMPTS, message
                    );
                    last_status = None;
                    last_message = message;
                }
            }
        }

        Err(ClientError::request_failed(
            method.as_str(),
            path,
            last_status,
            last_message,
        ))
    }

    /// Send a request with the bearer token, refreshing it once if expired
    async fn request_oauth2(
        &self,
        method: &Method,
        url: &str,
        body: &RequestBody,
    ) -> Result<Exchange> {
        let exchange = self.send(method, url, body).await?;

        match exchange {
            Exchange::Response { status, ref text }
                if status == StatusCode::BAD_REQUEST && is_token_expired(text) =>
            {
                debug!("Access token expired, re-authenticating");
                match self.tokens.refresh().await {
                    Ok(()) => self.send(method, url, body).await,
                    Err(e) if e.is_unreachable() => Ok(Exchange::Unreachable(e.to_string())),
                    Err(e) => Err(e),
                }
            }
            other => Ok(other),
        }
    }

    /// One round trip to the server
    async fn send(&self, method: &Method, url: &str, body: &RequestBody) -> Result<Exchange> {
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .bearer_auth(self.tokens.current());

        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(value) => request.form(value),
        };

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if is_connection_failure(&e) => {
                return Ok(Exchange::Unreachable(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        match response.text().await {
            Ok(text) => Ok(Exchange::Response { status, text }),
            Err(e) => Ok(Exchange::Unreachable(format!(
                "connection lost while reading the response: {}",
                e
            ))),
        }
    }
}

/// Parse a 200 body; empty or non-JSON bodies carry no value
fn parse_body(text: &str) -> Option<JsonValue> {
    if text.trim().is_empty() {
        return None;
    }
    serde_json::from_str(text).ok()
}
