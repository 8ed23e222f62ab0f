use super::schema::{FilesResponse, Page};
use super::storage::StorageDomain;
use crate::config::Config;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// Failure of a single page request.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("files request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("files endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("malformed files response: {0}")]
    Decode(String),
}

/// Everything needed to request one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub vendor: String,
    pub token: String,
    pub limit: u32,
    pub page: u32,
    /// Normalized search text; empty means no filter.
    pub search: String,
}

impl PageQuery {
    /// Both vendor and token are present.
    pub fn is_ready(&self) -> bool {
        !self.vendor.is_empty() && !self.token.is_empty()
    }

    /// Query-string pairs for `GET /files`. `search` is only sent when non-blank.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("vendor", self.vendor.clone()),
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
        ];
        let search = self.search.trim();
        if !search.is_empty() {
            params.push(("search", search.to_string()));
        }
        params
    }
}

/// Source of listing pages.
///
/// `Ok(None)` means the query was not ready (missing vendor or token) and
/// nothing was requested.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Option<Page>, FetchError>;
}

/// HTTP client for the files endpoint.
#[derive(Debug, Clone)]
pub struct FilesClient {
    http: reqwest::Client,
    api_url: String,
    storage: StorageDomain,
}

impl FilesClient {
    pub fn new(api_url: &str, storage: StorageDomain, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            storage,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_url,
            StorageDomain::new(config.storage_domain.clone()),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn storage(&self) -> &StorageDomain {
        &self.storage
    }

    /// Fetch one page of a vendor's files.
    ///
    /// Returns `Ok(None)` without touching the network when vendor or token is empty.
    pub async fn fetch_page(
        &self,
        vendor: &str,
        token: &str,
        page_size: u32,
        page_number: u32,
        search: &str,
    ) -> Result<Option<Page>, FetchError> {
        let query = PageQuery {
            vendor: vendor.to_string(),
            token: token.to_string(),
            limit: page_size,
            page: page_number,
            search: search.to_string(),
        };
        self.request(&query).await
    }

    async fn request(&self, query: &PageQuery) -> Result<Option<Page>, FetchError> {
        if !query.is_ready() {
            debug!("files query not ready, skipping");
            return Ok(None);
        }

        let url = format!("{}/files", self.api_url);
        let res = self
            .http
            .get(&url)
            .query(&query.params())
            .bearer_auth(&query.token)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            warn!(vendor = %query.vendor, page = query.page, %status, "files request rejected");
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = res.text().await?;
        let resp: FilesResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;
        debug!(
            vendor = %query.vendor,
            page = query.page,
            files = resp.files.len(),
            has_next = resp.has_next_page,
            "files page received"
        );
        Ok(Some(Page::from_response(resp, &self.storage)))
    }
}

#[async_trait]
impl PageSource for FilesClient {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Option<Page>, FetchError> {
        self.request(query).await
    }
}
