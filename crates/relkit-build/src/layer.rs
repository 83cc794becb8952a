//! Application layer creation.

use crate::BuildError;
use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Component, Path};

const DIR_MODE: u32 = 0o755;
const BINARY_MODE: u32 = 0o755;

/// A gzip-compressed layer holding the application binary.
#[derive(Debug, Clone)]
pub struct AppLayer {
    /// Compressed tarball, as pushed to the registry
    pub data: Vec<u8>,
    /// `sha256:` digest of the uncompressed tarball (goes into `rootfs.diff_ids`)
    pub diff_id: String,
    /// `sha256:` digest of `data`
    pub digest: String,
    /// Absolute path of the binary inside the image
    pub entrypoint: String,
}

/// Package `binary` as `<app_dir>/<name>` in a fresh layer.
pub fn binary_layer(binary: &Path, app_dir: &str, name: &str) -> Result<AppLayer, BuildError> {
    let app_dir = Path::new(app_dir);
    if !app_dir.is_absolute() {
        return Err(BuildError::InvalidAppDir(app_dir.display().to_string()));
    }

    let contents = std::fs::read(binary).map_err(|e| BuildError::ReadBinary {
        path: binary.to_path_buf(),
        source: e,
    })?;

    let tarball = build_tar(app_dir, name, &contents).map_err(|e| BuildError::Archive { source: e })?;
    let diff_id = sha256_digest(&tarball);

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&tarball)
        .map_err(|e| BuildError::Archive { source: e })?;
    let data = encoder
        .finish()
        .map_err(|e| BuildError::Archive { source: e })?;
    let digest = sha256_digest(&data);

    let entrypoint = app_dir.join(name).display().to_string();
    tracing::debug!(
        %entrypoint,
        %diff_id,
        size = data.len(),
        "created application layer"
    );

    Ok(AppLayer {
        data,
        diff_id,
        digest,
        entrypoint,
    })
}

/// Directory entries for every component of `app_dir`, then the binary.
fn build_tar(app_dir: &Path, name: &str, contents: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());

    let mut dir = std::path::PathBuf::new();
    for component in app_dir.components() {
        if let Component::Normal(part) = component {
            dir.push(part);
            let mut header = header(tar::EntryType::Directory, DIR_MODE, 0);
            builder.append_data(&mut header, &dir, std::io::empty())?;
        }
    }

    let mut header = header(tar::EntryType::Regular, BINARY_MODE, contents.len() as u64);
    builder.append_data(&mut header, dir.join(name), contents)?;

    builder.into_inner()
}

fn header(kind: tar::EntryType, mode: u32, size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mtime(0);
    header
}

pub(crate) fn sha256_digest(data: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(data)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_has_algorithm_prefix() {
        let d = sha256_digest(b"");
        assert_eq!(
            d,
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn tar_lists_parent_dirs_before_binary() {
        let tarball = build_tar(Path::new("/usr/local/bin"), "hello", b"ELF").unwrap();
        let mut archive = tar::Archive::new(tarball.as_slice());
        let paths: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["usr", "usr/local", "usr/local/bin", "usr/local/bin/hello"]
        );
    }
}
