use crate::keychain::{DockerKeychain, KeychainError};
use crate::registry::{ImageRegistry, OciRegistry, RegistryError};
use chrono::Utc;
use relkit_build::image::{ImageSpec, assemble};
use relkit_build::layer::binary_layer;
use relkit_build::{BinaryBuild, BuildError, CargoExecutor, ImageBuilder, RealExecutor};
use relkit_core::{CargoProject, ImageConfig, ImageReference, ImageTag, Platform, RelkitConfig};
use std::path::Path;

/// Image build settings after validation.
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub platform: Platform,
    /// Overrides the triple derived from `platform`
    pub rust_target: Option<String>,
    pub tag_prefix: String,
    pub app_dir: String,
    pub profile: String,
    pub cargo_args: Vec<String>,
}

impl PublishSettings {
    pub fn from_config(config: &ImageConfig) -> Result<Self, PublishError> {
        let platform: Platform = config
            .platform
            .parse()
            .map_err(|e| PublishError::Platform { source: e })?;
        Ok(Self {
            platform,
            rust_target: config.rust_target.clone(),
            tag_prefix: config.tag_prefix.clone(),
            app_dir: config.app_dir.clone(),
            profile: config.profile.clone(),
            cargo_args: config.cargo_args.clone(),
        })
    }

    /// Rust target triple the binary is compiled for.
    pub fn target(&self) -> Result<String, PublishError> {
        match &self.rust_target {
            Some(target) => Ok(target.clone()),
            None => self
                .platform
                .rust_target()
                .map(str::to_owned)
                .map_err(|e| PublishError::Platform { source: e }),
        }
    }
}

/// Runs the build-and-publish flow, parameterized over the registry and the
/// cargo executor for testability.
pub struct Publisher<R: ImageRegistry = OciRegistry, E: CargoExecutor = RealExecutor> {
    registry: R,
    builder: ImageBuilder<E>,
    settings: PublishSettings,
}

impl Publisher<OciRegistry, RealExecutor> {
    /// Publisher using ambient Docker credentials and the local `cargo`.
    pub fn new(config: &RelkitConfig) -> Result<Self, PublishError> {
        let settings = PublishSettings::from_config(&config.image)?;
        let keychain = DockerKeychain::from_default_location()
            .map_err(|e| PublishError::Keychain { source: e })?;
        tracing::debug!(?keychain, "loaded registry credentials");
        Ok(Self {
            registry: OciRegistry::new(&config.registry.insecure, keychain),
            builder: ImageBuilder::new(),
            settings,
        })
    }
}

impl<R: ImageRegistry, E: CargoExecutor> Publisher<R, E> {
    pub fn with_parts(registry: R, builder: ImageBuilder<E>, settings: PublishSettings) -> Self {
        Self {
            registry,
            builder,
            settings,
        }
    }

    pub fn settings(&self) -> &PublishSettings {
        &self.settings
    }

    /// Build the binary named by `import_path` under `source_dir`, stack it
    /// on `base_image`, and push it to `target_repo`.
    ///
    /// Returns the pushed image as a digest reference
    /// (`<registry>/<package>@sha256:...`).
    pub async fn build_and_publish(
        &self,
        source_dir: &Path,
        import_path: &str,
        base_image: &str,
        target_repo: &str,
    ) -> Result<ImageReference, PublishError> {
        let target = self.settings.target()?;
        let base_ref: ImageReference = base_image
            .parse()
            .map_err(|e| PublishError::InvalidReference { source: e })?;

        // 1. Base image
        let base = self
            .registry
            .resolve_base(&base_ref, &self.settings.platform)
            .await
            .map_err(|e| PublishError::Resolve { source: e })?;

        // 2. Import path → package
        let project = CargoProject::resolve(source_dir, import_path)
            .map_err(|e| PublishError::Project { source: e })?;

        // 3. Compile
        let build = BinaryBuild {
            project: &project,
            target: &target,
            profile: &self.settings.profile,
            extra_args: &self.settings.cargo_args,
        };
        let binary = self
            .builder
            .build_binary(&build)
            .await
            .map_err(|e| PublishError::Build { source: e })?;

        // 4. Layer + config
        let layer = binary_layer(&binary, &self.settings.app_dir, &project.default_binary)
            .map_err(|e| PublishError::Build { source: e })?;
        let spec = ImageSpec {
            platform: &self.settings.platform,
            created: Utc::now(),
            created_by: format!("relkit build {import_path}"),
        };
        let image = assemble(base, layer, &spec).map_err(|e| PublishError::Build { source: e })?;

        // 5. Name
        let tag = ImageTag::timestamped(&self.settings.tag_prefix, Utc::now())
            .map_err(|e| PublishError::InvalidReference { source: e })?;
        let reference = ImageReference::in_repo(target_repo, &project.name, &tag)
            .map_err(|e| PublishError::InvalidReference { source: e })?;

        // 6. Push
        let digest = self
            .registry
            .push(&reference, &image)
            .await
            .map_err(|e| PublishError::Push { source: e })?;

        let published = reference.with_digest(digest);
        tracing::info!(image = %published, "published");
        Ok(published)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("invalid image reference")]
    InvalidReference { source: relkit_core::Error },

    #[error("unusable target platform")]
    Platform { source: relkit_core::Error },

    #[error("failed to resolve import path")]
    Project { source: relkit_core::Error },

    #[error("failed to resolve base image")]
    Resolve { source: RegistryError },

    #[error("failed to build image")]
    Build { source: BuildError },

    #[error("failed to push image")]
    Push { source: RegistryError },

    #[error("failed to load registry credentials")]
    Keychain { source: KeychainError },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(platform: &str, rust_target: Option<&str>) -> ImageConfig {
        ImageConfig {
            platform: platform.to_owned(),
            rust_target: rust_target.map(str::to_owned),
            ..ImageConfig::default()
        }
    }

    #[test]
    fn target_derived_from_platform() {
        let settings = PublishSettings::from_config(&config("linux/arm64", None)).unwrap();
        assert_eq!(settings.target().unwrap(), "aarch64-unknown-linux-musl");
    }

    #[test]
    fn explicit_target_wins() {
        let settings = PublishSettings::from_config(&config(
            "linux/amd64",
            Some("x86_64-unknown-linux-gnu"),
        ))
        .unwrap();
        assert_eq!(settings.target().unwrap(), "x86_64-unknown-linux-gnu");
    }

    #[test]
    fn unknown_architecture_needs_explicit_target() {
        let settings = PublishSettings::from_config(&config("linux/s390x", None)).unwrap();
        assert!(matches!(
            settings.target(),
            Err(PublishError::Platform { .. })
        ));

        let settings =
            PublishSettings::from_config(&config("linux/s390x", Some("s390x-unknown-linux-gnu")))
                .unwrap();
        assert_eq!(settings.target().unwrap(), "s390x-unknown-linux-gnu");
    }

    #[test]
    fn malformed_platform_rejected() {
        let err = PublishSettings::from_config(&config("amd64", None)).unwrap_err();
        assert!(matches!(err, PublishError::Platform { .. }));
    }
}
