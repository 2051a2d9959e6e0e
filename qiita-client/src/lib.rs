//! Qiita HTTP Client
//!
//! A resilient client for running jobs on behalf of a Qiita server.
//!
//! The client authenticates with OAuth2 client credentials, transparently
//! refreshes an expired token, retries requests that could not reach the
//! server, and keeps a running job alive with periodic heartbeats.
//!
//! # Example
//!
//! ```no_run
//! use qiita_client::QiitaClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = QiitaClient::connect("https://localhost:21174", "client-id", "secret", None).await?;
//!
//!     let info = client.get_job_info("063e553b-327c-4818-ab4a-adfe58e49860").await?;
//!     println!("Job runs command: {}", info.command);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod heartbeat;
mod jobs;
mod token;
mod transport;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use heartbeat::{Heartbeat, HeartbeatPolicy, HeartbeatStop, JobCompletion, Liveness};
pub use qiita_core::domain::artifact::ArtifactInfo;
pub use qiita_core::domain::job::{JobInfo, JobParameters};
pub use qiita_core::dto::patch::PatchOp;
pub use token::TokenManager;
pub use transport::RequestBody;

use reqwest::{Certificate, Client};
use std::path::Path;
use std::time::Duration;

/// HTTP client for the Qiita REST API
///
/// Every request goes through a single retry routine that attaches the
/// current bearer token, refreshes it once when the server reports it as
/// expired, and classifies the answer into typed errors.
#[derive(Debug)]
pub struct QiitaClient {
    /// Base URL of the server (e.g., "https://localhost:21174")
    server_url: String,
    /// HTTP client instance, carries the TLS verification settings
    client: Client,
    /// Current access token
    tokens: TokenManager,
}

impl QiitaClient {
    /// Create a client and authenticate against the server
    ///
    /// # Arguments
    /// * `server_url` - The base URL of the Qiita server
    /// * `client_id` - OAuth2 client id
    /// * `client_secret` - OAuth2 client secret
    /// * `server_cert` - Certificate used to verify the server instead of the
    ///   default roots
    ///
    /// # Errors
    /// Fails with [`ClientError::Authentication`] if the server rejects the
    /// credentials, and with an unreachable [`ClientError::RequestFailed`]
    /// if it cannot be reached.
    pub async fn connect(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        server_cert: Option<&Path>,
    ) -> Result<Self> {
        let client = build_http_client(server_cert, None)?;
        Self::connect_with_client(server_url, client, client_id, client_secret).await
    }

    /// Create a client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    /// The same client is used for authentication and for every API call.
    pub async fn connect_with_client(
        server_url: impl Into<String>,
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        let tokens =
            TokenManager::acquire(client.clone(), &server_url, client_id, client_secret).await?;

        Ok(Self {
            server_url,
            client,
            tokens,
        })
    }

    /// Get the base URL of the server
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Get the current access token
    pub fn access_token(&self) -> String {
        self.tokens.current()
    }
}

/// Build the HTTP client used for every outbound call
///
/// # Arguments
/// * `server_cert` - PEM certificate to trust for the server, if any
/// * `timeout` - Per-call timeout, if any
pub fn build_http_client(server_cert: Option<&Path>, timeout: Option<Duration>) -> Result<Client> {
    let mut builder = Client::builder();

    if let Some(path) = server_cert {
        let pem = std::fs::read(path).map_err(|source| ClientError::Certificate {
            path: path.to_path_buf(),
            source,
        })?;
        let cert = Certificate::from_pem(&pem)?;
        builder = builder.add_root_certificate(cert);
    }

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}
