use crate::cargo::CargoError;

/// Abstraction over cargo execution for testability.
///
/// Production code uses [`RealExecutor`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait CargoExecutor: Send + Sync {
    /// Execute a cargo command, streaming output to the terminal.
    async fn exec_streaming(&self, args: &[String]) -> Result<(), CargoError>;
}

/// Real cargo executor. Honours `$CARGO` when set (e.g. under `cargo run`).
pub struct RealExecutor;

impl RealExecutor {
    fn program() -> std::ffi::OsString {
        std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into())
    }
}

impl CargoExecutor for RealExecutor {
    async fn exec_streaming(&self, args: &[String]) -> Result<(), CargoError> {
        use std::process::Stdio;

        tracing::debug!(?args, "running cargo");
        let status = tokio::process::Command::new(Self::program())
            .args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| CargoError::NotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(CargoError::CommandFailed {
                args: args.to_vec(),
                detail: status.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_command_reports_exit_status() {
        let args: Vec<String> = ["metadata", "--manifest-path", "/nonexistent/relkit/Cargo.toml"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let err = RealExecutor.exec_streaming(&args).await.unwrap_err();
        match err {
            CargoError::CommandFailed { args: failed, detail } => {
                assert_eq!(failed, args);
                assert!(detail.starts_with("exit status"), "got: {detail}");
            }
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }
}
