use crate::BuildError;
use crate::executor::{CargoExecutor, RealExecutor};
use relkit_core::CargoProject;
use std::path::PathBuf;

/// What to compile and how.
#[derive(Debug, Clone)]
pub struct BinaryBuild<'a> {
    pub project: &'a CargoProject,
    /// Rust target triple, e.g. `x86_64-unknown-linux-musl`
    pub target: &'a str,
    /// Cargo profile name (`release`, `dev`, or a custom profile)
    pub profile: &'a str,
    /// Extra arguments appended verbatim
    pub extra_args: &'a [String],
}

impl BinaryBuild<'_> {
    /// Arguments passed to `cargo`.
    pub fn cargo_args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_owned(),
            "--profile".to_owned(),
            self.profile.to_owned(),
            "--target".to_owned(),
            self.target.to_owned(),
            "--bin".to_owned(),
            self.project.default_binary.clone(),
            "--manifest-path".to_owned(),
            self.project.manifest_path.display().to_string(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }

    /// Where cargo leaves the compiled binary.
    pub fn artifact_path(&self) -> PathBuf {
        // The dev profile writes to `debug/`; every other profile uses its own name.
        let profile_dir = match self.profile {
            "dev" | "test" => "debug",
            "bench" => "release",
            other => other,
        };
        self.project
            .target_directory
            .join(self.target)
            .join(profile_dir)
            .join(&self.project.default_binary)
    }
}

/// Compiles binaries for an image, parameterized over the executor for testability.
pub struct ImageBuilder<E: CargoExecutor = RealExecutor> {
    executor: E,
}

impl ImageBuilder<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for ImageBuilder<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CargoExecutor> ImageBuilder<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    /// Compile the project's binary and return the path of the artifact.
    pub async fn build_binary(&self, build: &BinaryBuild<'_>) -> Result<PathBuf, BuildError> {
        tracing::info!(
            package = %build.project.name,
            binary = %build.project.default_binary,
            target = build.target,
            profile = build.profile,
            "compiling"
        );

        self.executor
            .exec_streaming(&build.cargo_args())
            .await
            .map_err(|e| BuildError::Compile {
                package: build.project.name.clone(),
                source: e,
            })?;

        let artifact = build.artifact_path();
        if !artifact.is_file() {
            return Err(BuildError::MissingArtifact { path: artifact });
        }
        Ok(artifact)
    }
}
