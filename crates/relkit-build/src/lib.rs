//! Binary builds and image assembly for relkit.
//!
//! # Build pipeline
//!
//! ```text
//! relkit publish <import-path>
//!   1. Compile   ── cargo build --target <triple> --bin <bin>   (CargoExecutor)
//!   2. Layer     ── <app_dir>/<bin> → tar → gzip                (layer::binary_layer)
//!   3. Assemble  ── base config + diff_id + entrypoint          (image::assemble)
//! ```
//!
//! Fetching the base image and pushing the result live in `relkit-publish`.
//!
//! # Layer contents
//!
//! The application layer holds the directories of `app_dir` and the binary
//! itself. Entries are owned by root with mtime 0, so rebuilding the same
//! binary yields the same layer digest.

pub mod builder;
pub mod cargo;
pub mod executor;
pub mod image;
pub mod layer;

pub use builder::{BinaryBuild, ImageBuilder};
pub use cargo::CargoError;
pub use executor::{CargoExecutor, RealExecutor};
pub use image::{BaseImage, BuiltImage, EncodedManifest, ImageSpec};
pub use layer::AppLayer;

/// Errors from compiling the binary and assembling the image.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("cargo build failed for {package}")]
    Compile { package: String, source: CargoError },

    #[error("cargo build succeeded but {path} was not produced")]
    MissingArtifact { path: std::path::PathBuf },

    #[error("failed to read binary {path}")]
    ReadBinary {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write layer archive")]
    Archive { source: std::io::Error },

    #[error("invalid app directory {0:?}: must be an absolute path")]
    InvalidAppDir(String),

    #[error("base image config is not a JSON object")]
    InvalidBaseConfig,

    #[error("failed to encode image config")]
    EncodeConfig { source: serde_json::Error },

    #[error("failed to encode image manifest")]
    EncodeManifest { source: serde_json::Error },

    #[error("failed to decode base image config")]
    DecodeConfig { source: serde_json::Error },
}
