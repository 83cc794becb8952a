#[derive(Debug, thiserror::Error)]
pub enum CargoError {
    #[error("cargo not found; install it from https://rustup.rs")]
    NotFound { source: std::io::Error },

    #[error("cargo command failed: {args:?}: {detail}")]
    CommandFailed { args: Vec<String>, detail: String },
}
