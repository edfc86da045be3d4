//! Where cover images live on this device.
//!
//! Covers are plain image files in a single directory, named after the book
//! they belong to. Archive import and export only ever go through the
//! [`CoverStore`] trait, so tests can swap in an in-memory store.

pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::backend::CoverStore;
pub use crate::models::CoverInfo;
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn CoverStore + Send + Sync>;
