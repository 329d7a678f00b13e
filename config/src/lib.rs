//! # Configuration System
//!
//! Configuration surface consumed by the fixture engine.
//!
//! This crate provides:
//! - An opaque dotted-key configuration tree with typed getters
//! - Configuration file loading (TOML/YAML)
//! - Environment variable loading
//! - Configuration precedence (explicit > env > file > defaults)
//! - Validated per-database engine settings

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;
pub mod settings;

pub use config::Configuration;
pub use file_loader::{load_from_file, load_from_toml, load_from_yaml, parse_toml, parse_yaml};
pub use loader::{DEFAULT_ENV_PREFIX, load_from_env, load_from_vars};
pub use precedence::merge_configs;
pub use settings::{
    DATABASES_SECTION, DatabaseSettings, READ_ONLY_TABLE_MANAGER_TYPE, database_settings
};
pub use validator::Validate;
