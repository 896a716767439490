//! Regenerates `src/proto/synq.ingest.sqlmesh.v1.rs` when built with
//! `--features regenerate-proto` (needs `protoc`). Regular builds use the
//! checked-in file.

#[cfg(feature = "regenerate-proto")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/synq/ingest/sqlmesh/v1/sqlmesh_service.proto");
    tonic_prost_build::configure()
        .build_client(true)
        .build_server(false)
        .out_dir("src/proto")
        .compile_protos(
            &["proto/synq/ingest/sqlmesh/v1/sqlmesh_service.proto"],
            &["proto"],
        )?;
    Ok(())
}

#[cfg(not(feature = "regenerate-proto"))]
fn main() {
    println!("cargo:rerun-if-changed=build.rs");
}
