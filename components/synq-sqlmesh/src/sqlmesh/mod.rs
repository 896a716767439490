pub mod api;
pub mod collector;
/// Aggregates built from `sqlmesh run` and `sqlmesh audit` logs.
pub mod execution_log;
/// Include and exclude patterns for file content collection.
pub mod glob_filter;
/// Aggregates and SQLMesh UI payload types.
pub mod models;

#[cfg(test)]
pub(crate) mod testing;
