// External crates
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::instrument;

/// Write `value` to `path` as pretty-printed JSON, replacing any existing file.
#[instrument(
    name = "synq_dump::write_json",
    target = "synq::dump",
    skip(value),
    level = "debug"
)]
pub async fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).context("failed to serialize collected data")?;
    tokio::fs::write(path, &json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;

    tracing::info!(path = %path.display(), bytes = json.len(), "Collected data written to file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::git::GitContext;
    use crate::sqlmesh::models::{
        CollectionError, ExecutionLogAggregate, MetadataAggregate, RawJson, Uploader,
    };
    use bytes::Bytes;
    use chrono::DateTime;
    use serde_json::{Value, json};

    fn aggregate() -> MetadataAggregate {
        let mut res = MetadataAggregate::new(&Uploader {
            version: "synq-sqlmesh/0.3.0".into(),
            build_time: "2024-05-01T10:00:00Z".into(),
        });
        res.api_meta = Some(RawJson::from(r#"{"version":"0.100.0"}"#));
        res.models = Some(RawJson::from(r#"[{"name":"sushi.orders"}]"#));
        res.model_lineage
            .insert("sushi.orders".into(), RawJson::from(r#"{"sushi.orders":[]}"#));
        res.file_content
            .insert("models/orders.sql".into(), RawJson::from("SELECT 1"));
        res.errors.push(CollectionError::Api {
            path: "http://localhost:8080/api/models/sushi.orders".into(),
            code: 500,
            message: "Internal Server Error".into(),
        });
        res.git_context = Some(GitContext {
            clone_url: "https://github.com/acme/sushi".into(),
            branch: "main".into(),
            commit_sha: "0123abcd".into(),
        });
        res
    }

    #[tokio::test]
    async fn round_trips_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        let res = aggregate();

        write_json(&res, &path).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \""));
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written, serde_json::to_value(&res).unwrap());
        assert_eq!(written["file_content"]["models/orders.sql"], json!("SELECT 1"));

        let back: MetadataAggregate = serde_json::from_str(&text).unwrap();
        assert_eq!(
            serde_json::to_value(&back).unwrap(),
            serde_json::to_value(&res).unwrap()
        );
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.json");
        std::fs::write(&path, "x".repeat(64 * 1024)).unwrap();

        write_json(&MetadataAggregate::new(&Uploader::default()), &path)
            .await
            .unwrap();

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(written.get("file_content").is_none());
        assert!(written.get("git_context").is_none());
    }

    #[tokio::test]
    async fn writes_execution_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let log = ExecutionLogAggregate {
            command: "run".into(),
            git_context: None,
            std_out: Bytes::from_static(b"Model batches executed"),
            started_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            finished_at: DateTime::from_timestamp(1_700_000_042, 0).unwrap(),
            uploader_version: "synq-sqlmesh/0.3.0".into(),
            uploader_build_time: "".into(),
        };

        write_json(&log, &path).await.unwrap();

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["command"], "run");
        assert_eq!(written["std_out"], "Model batches executed");
        assert_eq!(written["started_at"], "2023-11-14T22:13:20Z");
    }

    #[tokio::test]
    async fn execution_log_keeps_bytes_that_are_not_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.json");
        let std_out = b"caf\xe9 audit\n\xff".to_vec();
        let log = ExecutionLogAggregate {
            command: "audit".into(),
            git_context: None,
            std_out: Bytes::from(std_out.clone()),
            started_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            finished_at: DateTime::from_timestamp(1_700_000_001, 0).unwrap(),
            uploader_version: "synq-sqlmesh/0.3.0".into(),
            uploader_build_time: "".into(),
        };

        write_json(&log, &path).await.unwrap();

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let dumped: Vec<u8> = serde_json::from_value(written["std_out"].clone()).unwrap();
        assert_eq!(dumped, std_out);
    }

    #[tokio::test]
    async fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("metadata.json");

        let err = write_json(&aggregate(), &path).await.unwrap_err();
        assert!(err.to_string().contains("metadata.json"));
    }
}
