//! Recall Common - shared ambient concerns for Recall services.
//!
//! This crate provides:
//! - Logging setup with noise filtering
//! - Modular configuration loading (`graph.json` + `secrets.json`)
//! - A redacting, zeroizing `Secret` wrapper for credentials

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config_loader;
pub mod logging;
pub mod secret;

pub use config_loader::{load_store_config, load_store_config_with, merge_json};
pub use logging::{init_logging, LogFormat};
pub use secret::Secret;
