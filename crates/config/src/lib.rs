//! Configuration for shelf.
//!
//! Layered with `figment`, later layers winning:
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml`, `config.yaml` and `config.json` in the platform config
//!    directory, or a single explicitly given file
//! 3. Environment variables prefixed `SHELF_`, nested keys split on `__`
//!    (`SHELF_BACKUP__BUFFER_SIZE=131072`)

mod config;
pub mod error;

pub use crate::config::{BackupConfig, Config};
