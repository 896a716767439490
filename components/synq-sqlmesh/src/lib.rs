//! Collects metadata from a SQLMesh project through the SQLMesh UI REST API
//! and delivers it to Synq, either as a JSON file or over gRPC.

/// Command line surface of the `synq-sqlmesh` binary.
pub mod cli;
/// Git coordinates of the collected project.
pub mod git;
/// Configuration, build identity and protobuf conversions.
pub mod helpers;
/// Logging setup.
pub mod instrumentation;
/// Lifecycle of the `sqlmesh ui` process.
pub mod process;
/// Generated protobuf types.
pub mod proto;
/// Pipelines behind each CLI command.
pub mod runtime;
/// SQLMesh UI client, metadata collection and execution logs.
pub mod sqlmesh;
/// Delivery of aggregates to Synq, or to a JSON file.
pub mod synq;
