// Local crates
use crate::git::git::GitContext;

// External crates
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Raw response body of a SQLMesh UI endpoint, kept exactly as received.
///
/// Serialized documents embed the body as JSON when it parses as JSON and as
/// a plain string otherwise, so dumps stay readable without losing data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawJson(pub Bytes);

impl RawJson {
    /// Body as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// True for an empty body.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for RawJson {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static str> for RawJson {
    fn from(s: &'static str) -> Self {
        Self(Bytes::from_static(s.as_bytes()))
    }
}

impl Serialize for RawJson {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match serde_json::from_slice::<serde_json::Value>(&self.0) {
            Ok(value) => value.serialize(serializer),
            Err(_) => serializer.serialize_str(&String::from_utf8_lossy(&self.0)),
        }
    }
}

impl<'de> Deserialize<'de> for RawJson {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let bytes = serde_json::to_vec(&value).map_err(serde::de::Error::custom)?;
        Ok(Self(Bytes::from(bytes)))
    }
}

/// A single failed SQLMesh UI call recorded during collection.
///
/// `Api` is the structured kind, produced from a non-200 response. Everything
/// else (transport failures, undecodable payloads, bad patterns) is `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CollectionError {
    /// Non-200 response of the SQLMesh UI.
    Api {
        /// Full URL of the failed call.
        path: String,
        /// HTTP status.
        code: u16,
        /// Response body.
        message: String,
    },
    /// Any other failure, as text.
    Message {
        /// Error text.
        message: String,
    },
}

impl CollectionError {
    /// True for [`CollectionError::Api`].
    pub fn is_structured(&self) -> bool {
        matches!(self, CollectionError::Api { .. })
    }

    /// Human readable description of the failure.
    pub fn message(&self) -> &str {
        match self {
            CollectionError::Api { message, .. } | CollectionError::Message { message } => message,
        }
    }
}

/// Uploader identity attached to every aggregate sent to Synq.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Uploader {
    /// `synq-sqlmesh/<version>`
    pub version: String,
    /// RFC 3339 build timestamp, empty for local builds.
    pub build_time: String,
}

/// Everything one collection run obtained from the SQLMesh UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataAggregate {
    /// `/api/meta`
    pub api_meta: Option<RawJson>,
    /// `/api/models`
    pub models: Option<RawJson>,
    /// `/api/models/<name>` by model name.
    pub model_details: BTreeMap<String, RawJson>,
    /// `/api/lineage/<name>` by model name.
    pub model_lineage: BTreeMap<String, RawJson>,
    /// `/api/files`
    pub files: Option<RawJson>,
    /// `/api/environments`
    pub environments: Option<RawJson>,
    /// `/api/files/<path>` by project relative path. Only files accepted by
    /// the content filter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub file_content: BTreeMap<String, RawJson>,
    /// Calls that failed, in the order they were made.
    #[serde(default)]
    pub errors: Vec<CollectionError>,
    /// Version of the uploading binary.
    pub uploader_version: String,
    /// Build time of the uploading binary.
    pub uploader_build_time: String,
    /// When collection started.
    pub state_at: DateTime<Utc>,
    /// Repository state of the project, when it is a git checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_context: Option<GitContext>,
}

impl MetadataAggregate {
    /// Empty aggregate stamped with the current time. The timestamp marks the
    /// moment collection started, before any endpoint is called.
    pub fn new(uploader: &Uploader) -> Self {
        Self {
            api_meta: None,
            models: None,
            model_details: BTreeMap::new(),
            model_lineage: BTreeMap::new(),
            files: None,
            environments: None,
            file_content: BTreeMap::new(),
            errors: Vec::new(),
            uploader_version: uploader.version.clone(),
            uploader_build_time: uploader.build_time.clone(),
            state_at: Utc::now(),
            git_context: None,
        }
    }

    /// Attach (or clear) the git context.
    pub fn with_git_context(mut self, git_context: Option<GitContext>) -> Self {
        self.git_context = git_context;
        self
    }
}

/// Output of a `sqlmesh run` or `sqlmesh audit` invocation, captured from its
/// log file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionLogAggregate {
    /// `run` or `audit`
    pub command: String,
    /// Repository state of the project, when it is a git checkout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_context: Option<GitContext>,
    /// Exact content of the log file.
    #[serde(serialize_with = "serialize_log_output")]
    pub std_out: Bytes,
    /// Birth time of the log file.
    pub started_at: DateTime<Utc>,
    /// Last change time of the log file.
    pub finished_at: DateTime<Utc>,
    /// Version of the uploading binary.
    pub uploader_version: String,
    /// Build time of the uploading binary.
    pub uploader_build_time: String,
}

/// Text when the log is valid UTF-8, raw bytes otherwise. JSON renders the
/// latter as an array of numbers, so a dump always holds the exact log.
fn serialize_log_output<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) => serializer.serialize_str(text),
        Err(_) => serializer.serialize_bytes(bytes),
    }
}

/// Directory entry of the `/api/files` tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct DirectoryNode {
    /// Entry name without its parent path.
    #[serde(default)]
    pub name: String,
    /// Project relative path.
    #[serde(default)]
    pub path: String,
    /// Child directories.
    #[serde(default)]
    pub directories: Vec<DirectoryNode>,
    /// Files directly in this directory.
    #[serde(default)]
    pub files: Vec<FileNode>,
}

/// File entry of the `/api/files` tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FileNode {
    /// Entry name without its parent path.
    #[serde(default)]
    pub name: String,
    /// Project relative path.
    pub path: String,
    /// Includes the leading dot.
    pub extension: Option<String>,
    /// File text, present on `/api/files/<path>` responses.
    pub content: Option<String>,
}
