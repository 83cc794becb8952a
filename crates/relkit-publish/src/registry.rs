use crate::keychain::DockerKeychain;
use oci_distribution::client::{ClientConfig, ClientProtocol, ImageLayer};
use oci_distribution::errors::OciDistributionError;
use http::HeaderValue;
use oci_distribution::manifest::{
    ImageIndexEntry, OCI_IMAGE_MEDIA_TYPE, OciImageManifest, OciManifest,
};
use oci_distribution::{Client, Reference, RegistryOperation};
use relkit_build::{BaseImage, BuildError, BuiltImage};
use relkit_core::{ImageReference, Platform};

/// Abstraction over registry access for testability.
///
/// Production code uses [`OciRegistry`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait ImageRegistry: Send + Sync {
    /// Fetch the platform-specific manifest, config, and layers of a base image.
    async fn resolve_base(
        &self,
        reference: &ImageReference,
        platform: &Platform,
    ) -> Result<BaseImage, RegistryError>;

    /// Push all blobs and the manifest of `image` under `reference`'s tag.
    /// Returns the digest of the manifest bytes this call uploaded.
    async fn push(
        &self,
        reference: &ImageReference,
        image: &BuiltImage,
    ) -> Result<String, RegistryError>;
}

/// Registry client backed by `oci-distribution` with ambient Docker credentials.
pub struct OciRegistry {
    client: Client,
    keychain: DockerKeychain,
}

impl OciRegistry {
    /// Registries in `insecure` are reached over plain HTTP.
    pub fn new(insecure: &[String], keychain: DockerKeychain) -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::HttpsExcept(insecure.to_vec()),
            ..Default::default()
        };
        Self {
            client: Client::new(config),
            keychain,
        }
    }

    async fn pull_blob(
        &self,
        oci_ref: &Reference,
        descriptor: &oci_distribution::manifest::OciDescriptor,
        reference: &ImageReference,
    ) -> Result<Vec<u8>, RegistryError> {
        let mut data: Vec<u8> = Vec::new();
        self.client
            .pull_blob(oci_ref, descriptor, &mut data)
            .await
            .map_err(|e| RegistryError::Pull {
                reference: format!("{reference} ({})", descriptor.digest),
                source: e,
            })?;
        Ok(data)
    }
}

impl ImageRegistry for OciRegistry {
    async fn resolve_base(
        &self,
        reference: &ImageReference,
        platform: &Platform,
    ) -> Result<BaseImage, RegistryError> {
        let oci_ref = to_oci_reference(reference);
        let auth = self.keychain.auth_for(&reference.registry);
        let pull_err = |e| RegistryError::Pull {
            reference: reference.to_string(),
            source: e,
        };

        tracing::info!(%reference, %platform, "resolving base image");

        let (manifest, digest) = self
            .client
            .pull_manifest(&oci_ref, &auth)
            .await
            .map_err(pull_err)?;

        let (manifest, digest, oci_ref): (OciImageManifest, String, Reference) = match manifest {
            OciManifest::Image(manifest) => (manifest, digest, oci_ref),
            OciManifest::ImageIndex(index) => {
                let entry_digest = select_platform(&index.manifests, platform).ok_or_else(|| {
                    RegistryError::NoMatchingPlatform {
                        reference: reference.to_string(),
                        platform: platform.to_string(),
                        available: available_platforms(&index.manifests),
                    }
                })?;
                let by_digest = Reference::with_digest(
                    oci_ref.registry().to_owned(),
                    oci_ref.repository().to_owned(),
                    entry_digest,
                );
                let (manifest, digest) = self
                    .client
                    .pull_image_manifest(&by_digest, &auth)
                    .await
                    .map_err(pull_err)?;
                (manifest, digest, by_digest)
            }
        };

        tracing::debug!(%digest, layers = manifest.layers.len(), "base manifest resolved");

        let config = self.pull_blob(&oci_ref, &manifest.config, reference).await?;

        let mut layers = Vec::with_capacity(manifest.layers.len());
        for descriptor in &manifest.layers {
            tracing::debug!(digest = %descriptor.digest, size = descriptor.size, "pulling base layer");
            let data = self.pull_blob(&oci_ref, descriptor, reference).await?;
            layers.push(ImageLayer::new(
                data,
                descriptor.media_type.clone(),
                descriptor.annotations.clone(),
            ));
        }

        Ok(BaseImage {
            reference: reference.to_string(),
            digest,
            config,
            layers,
        })
    }

    async fn push(
        &self,
        reference: &ImageReference,
        image: &BuiltImage,
    ) -> Result<String, RegistryError> {
        let oci_ref = to_oci_reference(reference);
        let auth = self.keychain.auth_for(&reference.registry);
        let push_err = |e| RegistryError::Push {
            reference: reference.tagged(),
            source: e,
        };

        let manifest = image
            .encode_manifest()
            .map_err(|e| RegistryError::Manifest {
                reference: reference.tagged(),
                source: e,
            })?;

        tracing::info!(reference = %reference.tagged(), layers = image.layers.len(), "pushing image");

        self.client
            .auth(&oci_ref, &auth, RegistryOperation::Push)
            .await
            .map_err(push_err)?;

        let config_digest = image.config.sha256_digest();
        self.client
            .push_blob(&oci_ref, &image.config.data, &config_digest)
            .await
            .map_err(push_err)?;
        for layer in &image.layers {
            let digest = layer.sha256_digest();
            tracing::debug!(%digest, size = layer.data.len(), "pushing layer");
            self.client
                .push_blob(&oci_ref, &layer.data, &digest)
                .await
                .map_err(push_err)?;
        }

        // The tag may be moved by a concurrent push; the digest of the bytes
        // sent here still names this manifest.
        let manifest_url = self
            .client
            .push_manifest_raw(
                &oci_ref,
                manifest.bytes,
                HeaderValue::from_static(OCI_IMAGE_MEDIA_TYPE),
            )
            .await
            .map_err(push_err)?;

        tracing::info!(
            %manifest_url,
            digest = %manifest.digest,
            "image pushed"
        );

        Ok(manifest.digest)
    }
}

fn to_oci_reference(reference: &ImageReference) -> Reference {
    let registry = reference.registry.clone();
    let repository = reference.repository.clone();
    match (&reference.digest, &reference.tag) {
        (Some(digest), _) => Reference::with_digest(registry, repository, digest.clone()),
        (None, Some(tag)) => Reference::with_tag(registry, repository, tag.clone()),
        (None, None) => Reference::with_tag(registry, repository, "latest".to_owned()),
    }
}

/// Digest of the first index entry built for `platform`.
pub fn select_platform(entries: &[ImageIndexEntry], platform: &Platform) -> Option<String> {
    entries
        .iter()
        .find(|entry| {
            entry.platform.as_ref().is_some_and(|p| {
                platform.matches(&p.os, &p.architecture, p.variant.as_deref())
            })
        })
        .map(|entry| entry.digest.clone())
}

fn available_platforms(entries: &[ImageIndexEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(|entry| entry.platform.as_ref())
        .map(|p| match &p.variant {
            Some(variant) => format!("{}/{}/{variant}", p.os, p.architecture),
            None => format!("{}/{}", p.os, p.architecture),
        })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to pull {reference}")]
    Pull {
        reference: String,
        source: OciDistributionError,
    },

    #[error("failed to push {reference}")]
    Push {
        reference: String,
        source: OciDistributionError,
    },

    #[error("failed to encode manifest for {reference}")]
    Manifest {
        reference: String,
        source: BuildError,
    },

    #[error(
        "{reference} has no image for {platform}; available: {}",
        available.join(", ")
    )]
    NoMatchingPlatform {
        reference: String,
        platform: String,
        available: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(tag: Option<&str>, digest: Option<&str>) -> ImageReference {
        ImageReference {
            registry: "localhost:5000".to_owned(),
            repository: "hello".to_owned(),
            tag: tag.map(str::to_owned),
            digest: digest.map(str::to_owned),
        }
    }

    fn index_entries() -> Vec<ImageIndexEntry> {
        serde_json::from_value(serde_json::json!([
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:amd64",
                "size": 100,
                "platform": {"architecture": "amd64", "os": "linux"}
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:attestation",
                "size": 50
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:arm64",
                "size": 100,
                "platform": {"architecture": "arm64", "os": "linux", "variant": "v8"}
            },
            {
                "mediaType": "application/vnd.oci.image.manifest.v1+json",
                "digest": "sha256:armv7",
                "size": 100,
                "platform": {"architecture": "arm", "os": "linux", "variant": "v7"}
            }
        ]))
        .unwrap()
    }

    fn platform(s: &str) -> Platform {
        s.parse().unwrap()
    }

    #[test]
    fn selects_entry_for_platform() {
        let entries = index_entries();
        assert_eq!(
            select_platform(&entries, &platform("linux/amd64")).as_deref(),
            Some("sha256:amd64")
        );
        assert_eq!(
            select_platform(&entries, &platform("linux/arm/v7")).as_deref(),
            Some("sha256:armv7")
        );
    }

    #[test]
    fn arm64_matches_implied_v8_variant() {
        let entries = index_entries();
        assert_eq!(
            select_platform(&entries, &platform("linux/arm64")).as_deref(),
            Some("sha256:arm64")
        );
    }

    #[test]
    fn entries_without_platform_are_skipped() {
        let entries: Vec<ImageIndexEntry> = index_entries()
            .into_iter()
            .filter(|e| e.platform.is_none())
            .collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(select_platform(&entries, &platform("linux/amd64")), None);
    }

    #[test]
    fn no_matching_entry() {
        let entries = index_entries();
        assert_eq!(select_platform(&entries, &platform("linux/s390x")), None);
        assert_eq!(select_platform(&entries, &platform("linux/arm/v6")), None);
        assert_eq!(select_platform(&entries, &platform("windows/amd64")), None);
    }

    #[test]
    fn available_lists_platforms_with_variants() {
        assert_eq!(
            available_platforms(&index_entries()),
            vec!["linux/amd64", "linux/arm64/v8", "linux/arm/v7"]
        );
    }

    #[test]
    fn no_matching_platform_message_lists_available() {
        let err = RegistryError::NoMatchingPlatform {
            reference: "cgr.dev/chainguard/static:latest".to_owned(),
            platform: "linux/s390x".to_owned(),
            available: available_platforms(&index_entries()),
        };
        assert_eq!(
            err.to_string(),
            "cgr.dev/chainguard/static:latest has no image for linux/s390x; \
             available: linux/amd64, linux/arm64/v8, linux/arm/v7"
        );
    }

    #[test]
    fn oci_reference_with_tag() {
        let r = to_oci_reference(&reference(Some("test-1"), None));
        assert_eq!(r.to_string(), "localhost:5000/hello:test-1");
    }

    #[test]
    fn oci_reference_prefers_digest() {
        let digest = "sha256:0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
        let r = to_oci_reference(&reference(Some("test-1"), Some(digest)));
        assert_eq!(r.digest(), Some(digest));
    }

    #[test]
    fn oci_reference_defaults_to_latest() {
        let r = to_oci_reference(&reference(None, None));
        assert_eq!(r.tag(), Some("latest"));
    }
}
