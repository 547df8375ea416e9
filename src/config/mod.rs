// src/config/mod.rs

//! Configuration loading and validation for testrig.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Turn the raw model into validated process specs (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    ConfigSection, HarnessConfig, RawContainer, RawHarnessConfig, RawMillis, RawTester, Settings,
};
