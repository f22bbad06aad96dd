//! HTTP access to the node-local kubelet
//!
//! The fetcher only needs something that can issue a GET for a path; the
//! [`HttpClient`] trait keeps transport and authentication out of it.

use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default service account token mounted into pods
pub const IN_CLUSTER_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Something that can issue a GET against the kubelet
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET for `path`, relative to the client's base URL.
    ///
    /// Only transport failures are errors here; status handling is left
    /// to the caller.
    async fn get(&self, path: &str) -> FetchResult<Response>;
}

/// Configuration for [`KubeletClient`]
#[derive(Debug, Clone)]
pub struct KubeletClientConfig {
    /// Base URL of the kubelet, e.g. `https://10.0.0.12:10250`
    pub endpoint: String,
    /// File holding a bearer token, read once at construction
    pub token_path: Option<PathBuf>,
    /// Request timeout
    pub timeout: Duration,
    /// Accept the kubelet's self-signed serving certificate
    pub insecure_tls: bool,
}

impl Default for KubeletClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:10250".to_string(),
            token_path: None,
            timeout: Duration::from_secs(10),
            insecure_tls: false,
        }
    }
}

impl KubeletClientConfig {
    /// Use the in-cluster service account token if it is mounted
    pub fn with_in_cluster_token(mut self) -> Self {
        let path = Path::new(IN_CLUSTER_TOKEN_PATH);
        if path.exists() {
            self.token_path = Some(path.to_path_buf());
        }
        self
    }
}

/// `reqwest`-backed client for the kubelet read-only API
#[derive(Debug, Clone)]
pub struct KubeletClient {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl KubeletClient {
    /// Create a new kubelet client
    pub fn new(config: &KubeletClientConfig) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.insecure_tls)
            .build()
            .map_err(FetchError::Transport)?;

        let base_url = Url::parse(&config.endpoint)?;

        let bearer_token = match &config.token_path {
            Some(path) => Some(read_token(path)?),
            None => None,
        };

        debug!(
            endpoint = %base_url,
            authenticated = bearer_token.is_some(),
            "Created kubelet client"
        );

        Ok(Self {
            client,
            base_url,
            bearer_token,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl HttpClient for KubeletClient {
    async fn get(&self, path: &str) -> FetchResult<Response> {
        let url = self.base_url.join(path)?;

        let mut request = self.client.get(url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(FetchError::Transport)
    }
}

fn read_token(path: &Path) -> FetchResult<String> {
    std::fs::read_to_string(path)
        .map(|token| token.trim().to_string())
        .map_err(|source| FetchError::Token {
            path: path.display().to_string(),
            source,
        })
}
