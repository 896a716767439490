//! Typed client for the SQLMesh UI REST API.
//!
//! Every operation is a plain GET against a fixed resource path. Bodies are
//! returned as raw bytes; callers decide whether and when to decode them.
//! A non-200 answer becomes [`ApiError::Status`], the only error kind with a
//! stable shape, which the collector records as a structured error.

// Local crates
use crate::sqlmesh::models::CollectionError;

// External crates
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{StatusCode, Uri};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::instrument;
use url::Url;

/// Default upper bound for a single SQLMesh UI request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Failure of a single SQLMesh UI request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The UI answered with a status other than 200.
    #[error("SQLMesh UI API error at {url} ({code}): {message}")]
    Status {
        /// Requested URL.
        url: String,
        /// HTTP status.
        code: u16,
        /// Response body.
        message: String,
    },
    /// A request URL could not be built from the base address.
    #[error("invalid SQLMesh UI url {url}: {reason}")]
    InvalidUrl {
        /// URL as far as it was built.
        url: String,
        /// Parser error.
        reason: String,
    },
    /// Connecting or sending failed.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: hyper_util::client::legacy::Error,
    },
    /// The response body could not be read.
    #[error("failed to read response body from {url}: {source}")]
    Body {
        /// Requested URL.
        url: String,
        /// Underlying body error.
        #[source]
        source: hyper::Error,
    },
    /// No complete response within the request timeout.
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured request timeout.
        timeout: Duration,
    },
}

impl ApiError {
    /// True for errors produced from an HTTP status, as opposed to transport
    /// or local failures.
    pub fn is_structured(&self) -> bool {
        matches!(self, ApiError::Status { .. })
    }
}

impl From<&ApiError> for CollectionError {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Status { url, code, message } => CollectionError::Api {
                path: url.clone(),
                code: *code,
                message: message.clone(),
            },
            other => CollectionError::Message {
                message: other.to_string(),
            },
        }
    }
}

/// The SQLMesh UI resources the collector reads.
pub trait Api {
    /// `GET /health`
    fn health(&self) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/meta`
    fn meta(&self) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/models`
    fn models(&self) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/models/<name>`
    fn model(&self, name: &str) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/lineage/<name>`
    fn lineage(&self, name: &str) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/environments`
    fn environments(&self) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/files`
    fn files(&self) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
    /// `GET /api/files/<path>`
    fn file_content(&self, path: &str) -> impl Future<Output = Result<Bytes, ApiError>> + Send;
}

/// HTTP implementation of [`Api`].
///
/// Model names and file paths are appended as path segments with standard URL
/// joining. No further sanitising happens, so callers must not pass traversal
/// sequences.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    base_url: Url,
    request_timeout: Duration,
}

impl ApiClient {
    /// Client with [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(base_url: Url) -> Self {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Client that gives up on a request after `request_timeout`.
    pub fn with_timeout(base_url: Url, request_timeout: Duration) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            base_url,
            request_timeout,
        }
    }

    /// Address every request is relative to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join the base address with `segments`. A segment containing `/` (a
    /// file path) contributes one path segment per component.
    pub fn build_url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base address cannot carry a path".into(),
            })?;
            path.pop_if_empty();
            for segment in segments {
                path.extend(segment.split('/').filter(|part| !part.is_empty()));
            }
        }
        Ok(url)
    }

    #[instrument(
        name = "sqlmesh_api::get",
        target = "sqlmesh::api",
        skip_all,
        level = "debug"
    )]
    async fn get(&self, segments: &[&str]) -> Result<Bytes, ApiError> {
        let url = self.build_url(segments)?.to_string();
        let uri: Uri = url.parse().map_err(|e: hyper::http::uri::InvalidUri| {
            ApiError::InvalidUrl {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(url = %url, "Requesting SQLMesh UI resource");
        match timeout(self.request_timeout, self.fetch(uri, &url)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                url,
                timeout: self.request_timeout,
            }),
        }
    }

    async fn fetch(&self, uri: Uri, url: &str) -> Result<Bytes, ApiError> {
        let response = self
            .client
            .get(uri)
            .await
            .map_err(|source| ApiError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|source| ApiError::Body {
                url: url.to_string(),
                source,
            })?
            .to_bytes();

        if status != StatusCode::OK {
            tracing::debug!(url = %url, status = %status, "SQLMesh UI answered with non-OK status");
            return Err(ApiError::Status {
                url: url.to_string(),
                code: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(body)
    }
}

impl Api for ApiClient {
    async fn health(&self) -> Result<Bytes, ApiError> {
        self.get(&["health"]).await
    }

    async fn meta(&self) -> Result<Bytes, ApiError> {
        self.get(&["api", "meta"]).await
    }

    async fn models(&self) -> Result<Bytes, ApiError> {
        self.get(&["api", "models"]).await
    }

    async fn model(&self, name: &str) -> Result<Bytes, ApiError> {
        self.get(&["api", "models", name]).await
    }

    async fn lineage(&self, name: &str) -> Result<Bytes, ApiError> {
        self.get(&["api", "lineage", name]).await
    }

    async fn environments(&self) -> Result<Bytes, ApiError> {
        self.get(&["api", "environments"]).await
    }

    async fn files(&self) -> Result<Bytes, ApiError> {
        self.get(&["api", "files"]).await
    }

    async fn file_content(&self, path: &str) -> Result<Bytes, ApiError> {
        self.get(&["api", "files", path]).await
    }
}
