//! Identity of this binary, reported with every upload.

// Local crates
use crate::sqlmesh::models::Uploader;

/// Binary name.
pub const NAME: &str = "synq-sqlmesh";
/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// `synq-sqlmesh/<version>`
pub fn uploader_version() -> String {
    format!("{NAME}/{}", VERSION.trim())
}

/// Build timestamp injected through `SYNQ_SQLMESH_BUILD_TIME` at compile
/// time. Empty for local builds.
pub fn build_time() -> String {
    option_env!("SYNQ_SQLMESH_BUILD_TIME")
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Uploader identity of this build.
pub fn uploader() -> Uploader {
    Uploader {
        version: uploader_version(),
        build_time: build_time(),
    }
}
