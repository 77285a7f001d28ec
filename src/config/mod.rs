// src/config/mod.rs

//! Configuration loading and validation for forrest.
//!
//! Responsibilities:
//! - Define the run configuration snapshot and its payload form (`model.rs`).
//! - Layer the optional TOML file under the CLI (`loader.rs`).
//! - Validate globs, global sanity and mode requirements (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, merge_cli};
pub use model::{RawRunConfiguration, RunConfiguration};
pub use validate::validate_for_mode;
