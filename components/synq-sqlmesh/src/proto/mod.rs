//! Protobuf types and gRPC client for the Synq SQLMesh ingestion service.
//!
//! Generated from `proto/synq/ingest/sqlmesh/v1/sqlmesh_service.proto` with
//! `tonic-prost-build` (client only) and checked in, so building the crate
//! does not require `protoc`. Rebuild with `--features regenerate-proto` after
//! changing the `.proto`.

/// Package `synq.ingest.sqlmesh.v1`.
#[allow(missing_docs, clippy::all)]
pub mod ingest {
    include!("synq.ingest.sqlmesh.v1.rs");
}
