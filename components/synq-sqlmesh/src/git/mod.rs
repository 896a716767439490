/// Resolving [`git::GitContext`] for uploads.
pub mod git;
