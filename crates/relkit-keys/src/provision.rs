use crate::generator::{CosignKeyGenerator, KeyGenerator};
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Owner-only mode for the private key file.
pub const PRIVATE_KEY_MODE: u32 = 0o700;
/// World-readable mode for the public key file.
pub const PUBLIC_KEY_MODE: u32 = 0o755;

/// Outcome of [`KeyProvisioner::ensure_key_pair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    /// A new pair was generated and written.
    Generated { key_path: PathBuf, pub_path: PathBuf },
    /// `<prefix>.key` was already present; nothing was written.
    Existing { key_path: PathBuf },
}

impl KeyStatus {
    pub fn key_path(&self) -> &Path {
        match self {
            Self::Generated { key_path, .. } | Self::Existing { key_path } => key_path,
        }
    }
}

/// Provisions a signing key pair on disk, parameterized over the generator
/// for testability.
pub struct KeyProvisioner<G: KeyGenerator = CosignKeyGenerator> {
    generator: G,
}

impl KeyProvisioner<CosignKeyGenerator> {
    pub fn new() -> Self {
        Self {
            generator: CosignKeyGenerator,
        }
    }
}

impl Default for KeyProvisioner<CosignKeyGenerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: KeyGenerator> KeyProvisioner<G> {
    pub fn with_generator(generator: G) -> Self {
        Self { generator }
    }

    /// Ensure `<prefix>.key` and `<prefix>.pub` exist.
    ///
    /// When `<prefix>.key` already exists this is a no-op; its contents are
    /// not validated and `<prefix>.pub` is not checked. Otherwise a key pair
    /// is generated without a password and both halves are written.
    pub fn ensure_key_pair(&self, prefix: &Path) -> Result<KeyStatus, KeyError> {
        let key_path = with_suffix(prefix, ".key");
        let pub_path = with_suffix(prefix, ".pub");

        if key_path.exists() {
            tracing::debug!(path = %key_path.display(), "signing key already present");
            return Ok(KeyStatus::Existing { key_path });
        }

        if let Some(parent) = key_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| KeyError::CreateDir {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let pair = self.generator.generate(b"")?;

        write_key_file(&key_path, &pair.private_bytes, PRIVATE_KEY_MODE, true)?;
        write_key_file(&pub_path, &pair.public_bytes, PUBLIC_KEY_MODE, false)?;

        tracing::info!(
            key = %key_path.display(),
            public = %pub_path.display(),
            "generated signing key pair"
        );

        Ok(KeyStatus::Generated { key_path, pub_path })
    }
}

/// `prefix` with `suffix` appended to its final component.
fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Write `bytes` to `path` and apply `mode` regardless of the process umask.
///
/// The private key is opened create-new so a concurrent provisioner that
/// won the race is never overwritten.
#[cfg_attr(not(unix), allow(unused_variables))]
fn write_key_file(path: &Path, bytes: &[u8], mode: u32, create_new: bool) -> Result<(), KeyError> {
    let write_err = |e| KeyError::Write {
        path: path.to_path_buf(),
        source: e,
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(mode);
    }

    let mut file = options.open(path).map_err(write_err)?;
    file.write_all(bytes).map_err(write_err)?;
    file.sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
            KeyError::Permissions {
                path: path.to_path_buf(),
                source: e,
            }
        })?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key pair generation failed: {detail}")]
    Generate { detail: String },

    #[error("failed to create key directory {path}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write key file {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set permissions on {path}")]
    Permissions {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_appends_to_file_name() {
        let p = with_suffix(Path::new("dir/release-sdk-testkey"), ".key");
        assert_eq!(p, PathBuf::from("dir/release-sdk-testkey.key"));
    }

    #[test]
    fn suffix_keeps_existing_dots() {
        let p = with_suffix(Path::new("cosign.v2"), ".pub");
        assert_eq!(p, PathBuf::from("cosign.v2.pub"));
    }

    #[test]
    fn status_key_path() {
        let status = KeyStatus::Existing {
            key_path: PathBuf::from("a.key"),
        };
        assert_eq!(status.key_path(), Path::new("a.key"));
    }
}
