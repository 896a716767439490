//! Shipper - delivery of collected aggregates to Synq over gRPC.
//!
//! Every upload opens its own HTTP/2 channel, sends a single unary request
//! authorised with a bearer credential and drops the channel afterwards.
//! There are no retries: a failed upload is reported to the caller, which
//! decides whether the run fails.

// Local crates
use crate::{
    proto::ingest::{
        IngestExecutionRequest, IngestMetadataRequest,
        sql_mesh_service_client::SqlMeshServiceClient,
    },
    sqlmesh::models::{ExecutionLogAggregate, MetadataAggregate},
    synq::credentials::{CredentialError, CredentialProvider},
};

// External crates
use std::time::Duration;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::instrument;
use url::Url;

/// Production ingestion endpoint.
pub const DEFAULT_SYNQ_ENDPOINT: &str = "https://developer.synq.io/";
const DEFAULT_PORT: u16 = 443;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);
// Metadata of large projects with file content easily exceeds tonic's 4 MiB default.
const MAX_MESSAGE_SIZE: usize = 256 * 1024 * 1024;

/// Reasons an upload did not reach Synq.
#[derive(Debug, thiserror::Error)]
pub enum ShipperError {
    /// The endpoint is not an `http` or `https` URL with a host.
    #[error("invalid Synq endpoint {endpoint}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as configured.
        endpoint: String,
        /// What is wrong with it.
        reason: String,
    },
    /// No usable token.
    #[error(transparent)]
    Credentials(#[from] CredentialError),
    /// The token is not valid ASCII header text.
    #[error("Synq token cannot be sent as request metadata")]
    InvalidToken,
    /// Channel setup or TLS failed.
    #[error("connection to Synq failed: {0}")]
    ConnectionFailed(#[from] tonic::transport::Error),
    /// The call completed with a non-OK gRPC status.
    #[error("Synq rejected the upload: {0}")]
    Rpc(#[from] tonic::Status),
}

/// Address of the Synq ingestion service, normalised for tonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynqTarget {
    /// `scheme://host:port`, as tonic expects it.
    pub uri: String,
    /// Host without IPv6 brackets, used as the TLS server name.
    pub host: String,
    /// Set for `https` endpoints.
    pub tls: bool,
}

impl SynqTarget {
    /// Parse an endpoint URL. `https` endpoints use TLS, `http` endpoints are
    /// plaintext. A missing port defaults to 443.
    pub fn parse(endpoint: &str) -> Result<Self, ShipperError> {
        let invalid = |reason: String| ShipperError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };

        let url = Url::parse(endpoint.trim()).map_err(|e| invalid(e.to_string()))?;
        let tls = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| invalid("missing host".into()))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        Ok(Self {
            uri: format!("{}://{host}:{port}", url.scheme()),
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            tls,
        })
    }
}

/// Uploads aggregates to Synq on behalf of one invocation.
#[derive(Debug)]
pub struct Shipper<C> {
    target: SynqTarget,
    credentials: C,
}

impl<C: CredentialProvider + Sync> Shipper<C> {
    /// Validate `endpoint` up front. Nothing is connected until an upload.
    pub fn new(endpoint: &str, credentials: C) -> Result<Self, ShipperError> {
        Ok(Self {
            target: SynqTarget::parse(endpoint)?,
            credentials,
        })
    }

    /// Parsed endpoint.
    pub fn target(&self) -> &SynqTarget {
        &self.target
    }

    /// Send `res` as one `IngestMetadata` call.
    #[instrument(
        name = "synq_shipper::upload_metadata",
        target = "synq::shipper",
        skip_all,
        level = "debug"
    )]
    pub async fn upload_metadata(&self, res: MetadataAggregate) -> Result<(), ShipperError> {
        tracing::debug!(
            models = res.model_details.len(),
            files = res.file_content.len(),
            errors = res.errors.len(),
            "Uploading SQLMesh metadata to Synq"
        );
        let request = self.authorize(IngestMetadataRequest::from(res)).await?;
        let mut client = self.connect().await?;

        let response = client.ingest_metadata(request).await?;
        tracing::info!(response = ?response.get_ref(), "Metadata uploaded to Synq");
        Ok(())
    }

    /// Send `log` as one `IngestExecution` call.
    #[instrument(
        name = "synq_shipper::upload_execution",
        target = "synq::shipper",
        skip_all,
        fields(command = %log.command),
        level = "debug"
    )]
    pub async fn upload_execution(&self, log: ExecutionLogAggregate) -> Result<(), ShipperError> {
        let request = self.authorize(IngestExecutionRequest::from(log)).await?;
        let mut client = self.connect().await?;

        let response = client.ingest_execution(request).await?;
        tracing::info!(response = ?response.get_ref(), "Execution log uploaded to Synq");
        Ok(())
    }

    async fn authorize<T>(&self, message: T) -> Result<tonic::Request<T>, ShipperError> {
        let token = self.credentials.access_token().await?;
        let value: MetadataValue<Ascii> = format!("Bearer {token}")
            .parse()
            .map_err(|_| ShipperError::InvalidToken)?;

        let mut request = tonic::Request::new(message);
        request.metadata_mut().insert("authorization", value);
        Ok(request)
    }

    async fn connect(&self) -> Result<SqlMeshServiceClient<Channel>, ShipperError> {
        let mut endpoint = Endpoint::from_shared(self.target.uri.clone())?
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);
        if self.target.tls {
            endpoint = endpoint.tls_config(
                ClientTlsConfig::new()
                    .with_native_roots()
                    .domain_name(self.target.host.clone()),
            )?;
        }

        tracing::debug!(endpoint = %self.target.uri, tls = self.target.tls, "Connecting to Synq");
        let channel = endpoint.connect().await?;
        Ok(SqlMeshServiceClient::new(channel)
            .max_encoding_message_size(MAX_MESSAGE_SIZE)
            .max_decoding_message_size(MAX_MESSAGE_SIZE))
    }
}
