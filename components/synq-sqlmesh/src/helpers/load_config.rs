// Local crates
use crate::sqlmesh::{api::DEFAULT_REQUEST_TIMEOUT, glob_filter::GlobFilter};
use crate::synq::shipper::DEFAULT_SYNQ_ENDPOINT;

// External crates
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Effective settings of one invocation. Every section has defaults, so an
/// empty file is valid.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// `[sqlmesh]`
    pub sqlmesh: SqlMeshConfig,
    /// `[files]`
    pub files: FilesConfig,
    /// `[synq]`
    pub synq: SynqConfig,
    /// `[logging]`
    pub logging: LoggingConfig,
}

impl Config {
    /// Load and parse the configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` when given, otherwise start from defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}

/// Where the SQLMesh UI runs and whether we launch it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SqlMeshConfig {
    /// Executable used to launch the SQLMesh UI.
    pub command: String,
    /// Working directory of the launched UI and of `git`.
    pub project_dir: PathBuf,
    /// Launch `sqlmesh ui` ourselves instead of using a running instance.
    pub ui_start: bool,
    /// Host the UI listens on and we connect to.
    pub ui_host: String,
    /// Port the UI listens on and we connect to.
    pub ui_port: u16,
    /// Upper bound for a single SQLMesh UI request.
    pub request_timeout_secs: u64,
}

impl Default for SqlMeshConfig {
    fn default() -> Self {
        Self {
            command: "sqlmesh".into(),
            project_dir: PathBuf::from("."),
            ui_start: true,
            ui_host: "localhost".into(),
            ui_port: 8080,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl SqlMeshConfig {
    /// `http://<ui_host>:<ui_port>`
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!("http://{}:{}", self.ui_host, self.ui_port);
        Url::parse(&raw).with_context(|| format!("invalid SQLMesh UI address {raw}"))
    }

    /// Per-request timeout of the SQLMesh UI client.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Arguments of the `sqlmesh ui` invocation.
    pub fn ui_args(&self) -> Vec<String> {
        vec![
            "ui".into(),
            "--host".into(),
            self.ui_host.clone(),
            "--port".into(),
            self.ui_port.to_string(),
        ]
    }
}

/// File content collection.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FilesConfig {
    /// Off by default. Only the file tree is collected then.
    pub collect_content: bool,
    /// Comma separated glob patterns of files whose content is uploaded.
    pub include: String,
    /// Comma separated glob patterns removed from `include` matches.
    pub exclude: String,
}

impl FilesConfig {
    /// Filter for content collection. Accepts nothing when collection is off.
    pub fn filter(&self) -> GlobFilter {
        if self.collect_content {
            GlobFilter::new(&self.include, &self.exclude)
        } else {
            GlobFilter::exclude_everything()
        }
    }
}

/// Synq ingestion endpoint and token. The token is never printed.
#[derive(Deserialize, Serialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SynqConfig {
    /// gRPC endpoint URL, `https://` for TLS.
    pub endpoint: String,
    /// Long-lived API token. Required for uploads only.
    pub token: Option<String>,
}

impl Default for SynqConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SYNQ_ENDPOINT.into(),
            token: None,
        }
    }
}

impl std::fmt::Debug for SynqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynqConfig")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Optional file logging next to the console output.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Directory for daily rolling JSON logs. Console logging only when unset.
    pub directory: Option<PathBuf>,
}
