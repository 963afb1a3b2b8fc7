/// TOML configuration file: logging, engine limits and the static catalog.
pub mod toml_config;
