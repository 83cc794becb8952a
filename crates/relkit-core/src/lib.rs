//! Core types and configuration for relkit.
//!
//! This crate defines the `relkit.toml` schema ([`RelkitConfig`]),
//! import path resolution ([`CargoProject`]), image naming
//! ([`ImageReference`], [`ImageTag`]), target [`Platform`]s, and shared
//! error types.

pub mod cargo;
pub mod config;
pub mod error;
pub mod platform;
pub mod reference;

pub use cargo::{CargoBinary, CargoProject};
pub use config::{ImageConfig, KeysConfig, RegistryConfig, RelkitConfig};
pub use error::{Error, Result};
pub use platform::Platform;
pub use reference::{ImageReference, ImageTag};
