pub mod build_info;
pub mod converters;
/// TOML configuration file and its defaults.
pub mod load_config;
