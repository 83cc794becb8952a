use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Image naming ──
    #[error("invalid platform {value:?}: {reason}")]
    InvalidPlatform { value: String, reason: &'static str },

    #[error("no Rust target known for platform {0}; set `image.rust_target` in relkit.toml")]
    UnsupportedPlatform(String),

    #[error("invalid image reference {value:?}: {reason}")]
    InvalidReference { value: String, reason: &'static str },

    // ── Import path resolution ──
    #[error("cargo metadata failed for {manifest_path}: {detail}")]
    CargoMetadata {
        manifest_path: PathBuf,
        detail: String,
    },

    #[error(
        "import path {import_path:?} matches no package; workspace members: {}",
        format_members(workspace_members)
    )]
    UnknownImportPath {
        import_path: String,
        workspace_members: Vec<String>,
    },

    #[error("no binary target in package '{package}'; relkit needs a binary to put in the image")]
    NoBinaryTarget { package: String },

    #[error(
        "multiple binary targets found: {}; set `default-run` in Cargo.toml to select one",
        names.join(", ")
    )]
    MultipleBinaries { names: Vec<String> },
}

fn format_members(members: &[String]) -> String {
    if members.is_empty() {
        "(none)".to_owned()
    } else {
        members.join(", ")
    }
}
