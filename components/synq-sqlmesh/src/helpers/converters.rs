//! This module defines conversions between internal aggregates and their protobuf equivalents.
//!
//! These conversions are total (guaranteed to succeed): every internal field has a valid
//! representation in the protobuf type.

// Local crates
use crate::git::git::GitContext;
use crate::proto::ingest::{
    GitContext as ProtoGitContext, IngestExecutionRequest, IngestMetadataRequest,
    ingest_metadata_request::Error as ProtoError,
};
use crate::sqlmesh::models::{CollectionError, ExecutionLogAggregate, MetadataAggregate, RawJson};

// External crates
use chrono::{DateTime, Utc};
use prost_types::Timestamp;
use std::collections::{BTreeMap, HashMap};

/// Convert chrono::DateTime<Utc> -> prost_types::Timestamp
pub fn to_timestamp(at: DateTime<Utc>) -> Timestamp {
    Timestamp {
        seconds: at.timestamp(),
        nanos: at.timestamp_subsec_nanos() as i32,
    }
}

impl From<GitContext> for ProtoGitContext {
    fn from(git: GitContext) -> Self {
        Self {
            clone_url: git.clone_url,
            branch: git.branch,
            commit_sha: git.commit_sha,
        }
    }
}

impl From<CollectionError> for ProtoError {
    fn from(err: CollectionError) -> Self {
        match err {
            CollectionError::Api {
                path,
                code,
                message,
            } => Self {
                path: Some(path),
                code: Some(i64::from(code)),
                message,
            },
            CollectionError::Message { message } => Self {
                path: None,
                code: None,
                message,
            },
        }
    }
}

impl From<MetadataAggregate> for IngestMetadataRequest {
    fn from(res: MetadataAggregate) -> Self {
        Self {
            api_meta: raw_bytes(res.api_meta),
            models: raw_bytes(res.models),
            model_details: raw_map(res.model_details),
            model_lineage: raw_map(res.model_lineage),
            files: raw_bytes(res.files),
            environments: raw_bytes(res.environments),
            file_content: raw_map(res.file_content),
            errors: res.errors.into_iter().map(Into::into).collect(),
            uploader_version: res.uploader_version,
            uploader_build_time: res.uploader_build_time,
            state_at: Some(to_timestamp(res.state_at)),
            git_context: res.git_context.map(Into::into),
        }
    }
}

impl From<ExecutionLogAggregate> for IngestExecutionRequest {
    fn from(log: ExecutionLogAggregate) -> Self {
        Self {
            command: log.command,
            git_context: log.git_context.map(Into::into),
            std_out: log.std_out.to_vec(),
            started_at: Some(to_timestamp(log.started_at)),
            finished_at: Some(to_timestamp(log.finished_at)),
            uploader_version: log.uploader_version,
            uploader_build_time: log.uploader_build_time,
        }
    }
}

fn raw_bytes(raw: Option<RawJson>) -> Vec<u8> {
    raw.map(|r| r.0.to_vec()).unwrap_or_default()
}

fn raw_map(map: BTreeMap<String, RawJson>) -> HashMap<String, Vec<u8>> {
    map.into_iter().map(|(k, v)| (k, v.0.to_vec())).collect()
}
