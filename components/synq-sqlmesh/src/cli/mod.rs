/// Argument parsing and command dispatch.
pub mod cli;
