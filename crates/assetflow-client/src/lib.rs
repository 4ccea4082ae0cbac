//! HTTP client for the remote asset service.
//!
//! Provides a minimal client with configurable auth (Bearer token or
//! X-API-Key), the [`AssetStore`] and [`UploadTransport`] trait seams the
//! pipeline consumes, and their HTTP implementations (upload with byte
//! progress, fetch-by-hash dedup lookup, link requests).

pub mod api;
pub mod traits;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

pub use traits::{AssetStore, LinkRequest, UploadTransport};

/// Authentication strategy for the asset service.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// API version prefix (e.g. "/api/v1"). Set ASSETFLOW_API_VERSION to match
/// the server.
pub fn api_prefix() -> String {
    let version = std::env::var("ASSETFLOW_API_VERSION").unwrap_or_else(|_| "v1".to_string());
    format!("/api/{}", version)
}

/// HTTP client for the remote asset service with configurable auth.
#[derive(Clone, Debug)]
pub struct AssetServiceClient {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl AssetServiceClient {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create client from environment: ASSETFLOW_API_URL, ASSETFLOW_API_KEY.
    /// Uses X-API-Key auth by default.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ASSETFLOW_API_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let api_key = std::env::var("ASSETFLOW_API_KEY")
            .context("Missing API key. Set ASSETFLOW_API_KEY")?;

        Self::new(base_url, Auth::XApiKey(api_key))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }

    /// Raw client for custom requests. Caller must apply auth via build_url
    /// and headers.
    pub fn client(&self) -> &Client {
        &self.client
    }
}
