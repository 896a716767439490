//! Best-effort crawl of the SQLMesh UI.
//!
//! Collection never stops on a failed call. Each failure is logged right away
//! and recorded in the aggregate's error list so Synq can tell what is
//! missing. The sequence is strictly sequential and always runs to the end:
//!
//! 1. `/api/meta`
//! 2. `/api/models`, then for each model name `/api/models/{name}` and
//!    `/api/lineage/{name}`
//! 3. `/api/files`, then `/api/files/{path}` for every file the glob filter
//!    accepts, in breadth-first order
//! 4. `/api/environments`

// Local crates
use crate::sqlmesh::{
    api::{Api, ApiError},
    glob_filter::{GlobFilter, GlobFilterError},
    models::{CollectionError, DirectoryNode, MetadataAggregate, RawJson, Uploader},
};

// External crates
use anyhow::Result;
use bytes::Bytes;
use serde::Deserialize;
use std::collections::VecDeque;
use tracing::instrument;

/// Crawl everything reachable through `api` into a fresh aggregate.
///
/// The error is reserved for failures that leave nothing worth delivering;
/// individual endpoint failures end up in [`MetadataAggregate::errors`].
#[instrument(
    name = "sqlmesh_collector::collect",
    target = "sqlmesh::collector",
    skip_all,
    level = "debug"
)]
pub async fn collect_metadata<A: Api>(
    api: &A,
    file_filter: &GlobFilter,
    uploader: &Uploader,
) -> Result<MetadataAggregate> {
    let mut res = MetadataAggregate::new(uploader);

    let meta = api.meta().await;
    res.api_meta = record(&mut res, meta, "meta information").map(RawJson::from);

    let models = api.models().await;
    res.models = record(&mut res, models, "models information").map(RawJson::from);

    let model_names = match res.models.as_ref().map(|m| model_names(m.as_bytes())) {
        Some(Ok(names)) => names,
        Some(Err(e)) => {
            tracing::error!(error = %e, "Failed to get model names");
            res.errors.push(CollectionError::Message {
                message: format!("failed to decode model names: {e}"),
            });
            Vec::new()
        }
        None => Vec::new(),
    };
    tracing::info!(models = model_names.len(), "Collecting model details and lineage");

    for name in model_names {
        let detail = api.model(&name).await;
        if let Some(detail) = record(&mut res, detail, &format!("model details of {name}")) {
            res.model_details.insert(name.clone(), detail.into());
        }

        let lineage = api.lineage(&name).await;
        if let Some(lineage) = record(&mut res, lineage, &format!("model lineage of {name}")) {
            res.model_lineage.insert(name, lineage.into());
        }
    }

    let files = api.files().await;
    res.files = record(&mut res, files, "files information").map(RawJson::from);
    collect_file_content(api, file_filter, &mut res).await;

    let environments = api.environments().await;
    res.environments = record(&mut res, environments, "environments information").map(RawJson::from);

    tracing::info!(
        models = res.model_details.len(),
        files = res.file_content.len(),
        errors = res.errors.len(),
        "SQLMesh metadata collected"
    );
    Ok(res)
}

/// Fetch the content of every accepted file of the already collected tree.
async fn collect_file_content<A: Api>(api: &A, filter: &GlobFilter, res: &mut MetadataAggregate) {
    let Some(files) = res.files.as_ref().filter(|f| !f.is_empty()) else {
        return;
    };

    let tree: DirectoryNode = match serde_json::from_slice(files.as_bytes()) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::error!(error = %e, "Failed to unmarshal /api/files response, skipping file content");
            return;
        }
    };

    let paths = match select_files(&tree, filter) {
        Ok(paths) => paths,
        Err(e) => {
            tracing::error!(error = %e, "Failed to collect files for processing");
            res.errors.push(CollectionError::Message {
                message: format!("failed to collect files for processing: {e}"),
            });
            return;
        }
    };
    tracing::info!(files = paths.len(), "Collecting file content");

    for path in paths {
        let content = api.file_content(&path).await;
        if let Some(content) = record(res, content, &format!("file content {path}")) {
            res.file_content.insert(path, content.into());
        }
    }
}

/// Breadth-first walk of the file tree: files of a directory first, then its
/// subdirectories in the order the tree lists them. Returns the accepted file
/// paths in visiting order.
///
/// A fatal filter error (bad include pattern) aborts the walk. Any other
/// match error only skips the offending path.
pub fn select_files(root: &DirectoryNode, filter: &GlobFilter) -> Result<Vec<String>, GlobFilterError> {
    let mut selected = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(dir) = queue.pop_front() {
        for file in &dir.files {
            match filter.is_match(&file.path) {
                Ok(true) => selected.push(file.path.clone()),
                Ok(false) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::error!(error = %e, path = %file.path, "Failed to match file path");
                }
            }
        }
        queue.extend(dir.directories.iter());
    }

    Ok(selected)
}

/// Names listed by `/api/models`, trimmed. Blank names are dropped.
pub fn model_names(models: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    #[derive(Deserialize)]
    struct Model {
        #[serde(default)]
        name: Option<String>,
    }

    let decoded: Vec<Option<Model>> = serde_json::from_slice(models)?;
    Ok(decoded
        .into_iter()
        .flatten()
        .filter_map(|m| m.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

fn record(res: &mut MetadataAggregate, result: Result<Bytes, ApiError>, what: &str) -> Option<Bytes> {
    match result {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to get {what}");
            res.errors.push(CollectionError::from(&e));
            None
        }
    }
}
