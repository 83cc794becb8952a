//! Stacking the application layer on a base image.

use crate::BuildError;
use crate::layer::{AppLayer, sha256_digest};
use chrono::{DateTime, SecondsFormat, Utc};
use oci_distribution::client::{Config, ImageLayer};
use oci_distribution::manifest::{
    IMAGE_CONFIG_MEDIA_TYPE, IMAGE_LAYER_GZIP_MEDIA_TYPE, OciImageManifest,
};
use relkit_core::Platform;
use serde_json::{Map, Value, json};

/// A resolved base image: its manifest digest, raw config, and layer blobs.
#[derive(Clone)]
pub struct BaseImage {
    /// Reference the base was resolved from
    pub reference: String,
    /// Digest of the platform-specific manifest
    pub digest: String,
    /// Raw image config JSON
    pub config: Vec<u8>,
    /// Layer blobs in manifest order
    pub layers: Vec<ImageLayer>,
}

/// Everything needed to push the new image.
#[derive(Clone)]
pub struct BuiltImage {
    pub layers: Vec<ImageLayer>,
    pub config: Config,
    pub manifest: OciImageManifest,
}

// `ImageLayer` and `Config` from oci-distribution do not implement `Debug`,
// so these impls stand in for `#[derive(Debug)]`.
struct BlobDebug<'a>(&'a [u8], &'a str, &'a Option<std::collections::HashMap<String, String>>);

impl std::fmt::Debug for BlobDebug<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("data_len", &self.0.len())
            .field("media_type", &self.1)
            .field("annotations", self.2)
            .finish()
    }
}

fn layers_debug(layers: &[ImageLayer]) -> Vec<BlobDebug<'_>> {
    layers
        .iter()
        .map(|l| BlobDebug(&l.data, &l.media_type, &l.annotations))
        .collect()
}

impl std::fmt::Debug for BaseImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseImage")
            .field("reference", &self.reference)
            .field("digest", &self.digest)
            .field("config", &self.config)
            .field("layers", &layers_debug(&self.layers))
            .finish()
    }
}

impl std::fmt::Debug for BuiltImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = &self.config;
        f.debug_struct("BuiltImage")
            .field("layers", &layers_debug(&self.layers))
            .field("config", &BlobDebug(&c.data, &c.media_type, &c.annotations))
            .field("manifest", &self.manifest)
            .finish()
    }
}

/// A manifest serialized once, with the digest of exactly those bytes.
#[derive(Debug, Clone)]
pub struct EncodedManifest {
    pub bytes: Vec<u8>,
    /// `sha256:` digest of `bytes`
    pub digest: String,
}

impl BuiltImage {
    /// Serialize the manifest for upload. The registry must receive these
    /// bytes unchanged for `digest` to address the pushed manifest.
    pub fn encode_manifest(&self) -> Result<EncodedManifest, BuildError> {
        let bytes = serde_json::to_vec(&self.manifest)
            .map_err(|e| BuildError::EncodeManifest { source: e })?;
        let digest = sha256_digest(&bytes);
        Ok(EncodedManifest { bytes, digest })
    }
}

/// Image-level settings applied on top of the base config.
#[derive(Debug, Clone)]
pub struct ImageSpec<'a> {
    pub platform: &'a Platform,
    pub created: DateTime<Utc>,
    /// Recorded in the history entry of the new layer
    pub created_by: String,
}

/// Append `app` to `base` and rewrite the config for the new image.
///
/// The config keeps everything the base set (env, user, labels, ...)
/// except:
/// - `architecture`, `os`, `variant` come from the build platform
/// - `config.Entrypoint` is the application binary and `config.Cmd` is cleared
/// - `rootfs.diff_ids` gains the new layer's diff_id
/// - `history` gains an entry for the new layer
pub fn assemble(base: BaseImage, app: AppLayer, spec: &ImageSpec<'_>) -> Result<BuiltImage, BuildError> {
    let mut config: Value = serde_json::from_slice(&base.config)
        .map_err(|e| BuildError::DecodeConfig { source: e })?;
    let root = config.as_object_mut().ok_or(BuildError::InvalidBaseConfig)?;

    let created = spec.created.to_rfc3339_opts(SecondsFormat::Secs, true);

    root.insert("architecture".to_owned(), json!(spec.platform.architecture));
    root.insert("os".to_owned(), json!(spec.platform.os));
    match &spec.platform.variant {
        Some(variant) => {
            root.insert("variant".to_owned(), json!(variant));
        }
        None => {
            root.remove("variant");
        }
    }
    root.insert("created".to_owned(), json!(created));

    let container = object_entry(root, "config")?;
    container.insert("Entrypoint".to_owned(), json!([app.entrypoint]));
    container.remove("Cmd");

    let rootfs = object_entry(root, "rootfs")?;
    rootfs.insert("type".to_owned(), json!("layers"));
    array_entry(rootfs, "diff_ids")?.push(json!(app.diff_id));

    array_entry(root, "history")?.push(json!({
        "created": created,
        "created_by": spec.created_by,
        "comment": "relkit",
    }));

    let config_bytes =
        serde_json::to_vec(&config).map_err(|e| BuildError::EncodeConfig { source: e })?;
    let config = Config::new(config_bytes, IMAGE_CONFIG_MEDIA_TYPE.to_owned(), None);

    let mut layers = base.layers;
    layers.push(ImageLayer::new(
        app.data,
        IMAGE_LAYER_GZIP_MEDIA_TYPE.to_owned(),
        None,
    ));

    let manifest = OciImageManifest::build(&layers, &config, None);

    tracing::debug!(
        base = %base.reference,
        base_digest = %base.digest,
        layers = layers.len(),
        "assembled image"
    );

    Ok(BuiltImage {
        layers,
        config,
        manifest,
    })
}

/// The object stored under `key`, inserting an empty one when absent or null.
fn object_entry<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Map<String, Value>, BuildError> {
    let entry = parent.entry(key).or_insert_with(|| json!({}));
    if entry.is_null() {
        *entry = json!({});
    }
    entry.as_object_mut().ok_or(BuildError::InvalidBaseConfig)
}

/// The array stored under `key`, inserting an empty one when absent or null.
fn array_entry<'a>(
    parent: &'a mut Map<String, Value>,
    key: &str,
) -> Result<&'a mut Vec<Value>, BuildError> {
    let entry = parent.entry(key).or_insert_with(|| json!([]));
    if entry.is_null() {
        *entry = json!([]);
    }
    entry.as_array_mut().ok_or(BuildError::InvalidBaseConfig)
}
