//! Build-and-publish flow for relkit.
//!
//! [`Publisher::build_and_publish`] resolves a base image, compiles the
//! binary an import path names, stacks it on the base, and pushes the result
//! under a fresh `<prefix>-<unix seconds>` tag. The first failing step
//! aborts the whole flow; nothing is retried.

pub mod keychain;
pub mod publisher;
pub mod registry;

pub use keychain::{DockerKeychain, KeychainError};
pub use publisher::{PublishError, PublishSettings, Publisher};
pub use registry::{ImageRegistry, OciRegistry, RegistryError};
