//! Ambient registry credentials from the Docker CLI config.
//!
//! Reads `$DOCKER_CONFIG/config.json`, falling back to
//! `~/.docker/config.json`. Only inline `auths` entries are used; credential
//! helpers (`credsStore`, `credHelpers`) are not invoked. Registries without
//! an entry are accessed anonymously.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oci_distribution::secrets::RegistryAuth;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DOCKER_HUB_KEY: &str = "index.docker.io";

#[derive(Debug, Default, Deserialize)]
struct DockerConfigFile {
    #[serde(default)]
    auths: HashMap<String, AuthEntry>,
    #[serde(default, rename = "credsStore")]
    creds_store: Option<String>,
    #[serde(default, rename = "credHelpers")]
    cred_helpers: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    auth: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

struct Credential {
    username: String,
    password: SecretString,
}

/// Per-registry credentials loaded from a Docker config file.
#[derive(Default)]
pub struct DockerKeychain {
    credentials: HashMap<String, Credential>,
}

impl std::fmt::Debug for DockerKeychain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerKeychain")
            .field("registries", &self.credentials.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DockerKeychain {
    /// Keychain from the default Docker config location. A missing file
    /// yields an empty keychain.
    pub fn from_default_location() -> Result<Self, KeychainError> {
        match default_config_path() {
            Some(path) => Self::from_path(&path),
            None => {
                tracing::debug!("no home directory; using anonymous registry access");
                Ok(Self::default())
            }
        }
    }

    /// Keychain from a specific config file. A missing file yields an
    /// empty keychain.
    pub fn from_path(path: &Path) -> Result<Self, KeychainError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "docker config not found");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| KeychainError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: DockerConfigFile =
            serde_json::from_str(&content).map_err(|e| KeychainError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;

        for helper in configured_helpers(&file) {
            tracing::warn!(
                %helper,
                "docker credential helpers are not consulted; only inline auths are used"
            );
        }

        let mut credentials = HashMap::new();
        for (registry, entry) in file.auths {
            match decode_entry(&entry) {
                Some(credential) => {
                    credentials.insert(normalize_registry(&registry), credential);
                }
                None => {
                    tracing::warn!(%registry, "skipping docker auth entry without usable credentials");
                }
            }
        }

        Ok(Self { credentials })
    }

    /// Credentials for `registry`, or anonymous access.
    pub fn auth_for(&self, registry: &str) -> RegistryAuth {
        match self.credentials.get(&normalize_registry(registry)) {
            Some(c) => RegistryAuth::Basic(c.username.clone(), c.password.expose_secret().to_owned()),
            None => RegistryAuth::Anonymous,
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os("DOCKER_CONFIG") {
        return Some(PathBuf::from(dir).join("config.json"));
    }
    dirs::home_dir().map(|home| home.join(".docker").join("config.json"))
}

/// `credsStore` first, then the `credHelpers` entries in sorted order.
fn configured_helpers(file: &DockerConfigFile) -> Vec<String> {
    let mut helpers: Vec<String> = file
        .cred_helpers
        .iter()
        .map(|(registry, helper)| format!("{helper} ({registry})"))
        .collect();
    helpers.sort();
    if let Some(store) = &file.creds_store {
        helpers.insert(0, store.clone());
    }
    helpers
}

/// `auth` (base64 `user:pass`) wins over separate `username`/`password`.
fn decode_entry(entry: &AuthEntry) -> Option<Credential> {
    if let Some(encoded) = entry.auth.as_deref().filter(|a| !a.is_empty()) {
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        return Some(Credential {
            username: username.to_owned(),
            password: SecretString::from(password.to_owned()),
        });
    }

    match (&entry.username, &entry.password) {
        (Some(username), Some(password)) => Some(Credential {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        }),
        _ => None,
    }
}

/// Normalize a registry key: strip scheme and path, fold Docker Hub aliases.
fn normalize_registry(registry: &str) -> String {
    let host = registry
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = host.split('/').next().unwrap_or(host);
    match host {
        "docker.io" | "index.docker.io" | "registry-1.docker.io" => DOCKER_HUB_KEY.to_owned(),
        other => other.to_owned(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeychainError {
    #[error("failed to read docker config {path}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse docker config {path}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_and_path() {
        assert_eq!(normalize_registry("https://ghcr.io/v2/"), "ghcr.io");
        assert_eq!(normalize_registry("localhost:5000"), "localhost:5000");
    }

    #[test]
    fn normalize_folds_docker_hub_aliases() {
        assert_eq!(normalize_registry("https://index.docker.io/v1/"), DOCKER_HUB_KEY);
        assert_eq!(normalize_registry("docker.io"), DOCKER_HUB_KEY);
        assert_eq!(normalize_registry("registry-1.docker.io"), DOCKER_HUB_KEY);
    }

    #[test]
    fn helpers_from_creds_store_and_cred_helpers() {
        let file: DockerConfigFile = serde_json::from_str(
            r#"{
                "credsStore": "desktop",
                "credHelpers": {"gcr.io": "gcloud", "123.dkr.ecr.us-east-1.amazonaws.com": "ecr-login"}
            }"#,
        )
        .unwrap();

        assert_eq!(
            configured_helpers(&file),
            vec![
                "desktop",
                "ecr-login (123.dkr.ecr.us-east-1.amazonaws.com)",
                "gcloud (gcr.io)",
            ]
        );
    }

    #[test]
    fn no_helpers_configured() {
        let file: DockerConfigFile = serde_json::from_str(r#"{"auths": {}}"#).unwrap();
        assert!(configured_helpers(&file).is_empty());
    }

    #[test]
    fn decode_rejects_auth_without_colon() {
        let entry = AuthEntry {
            auth: Some(STANDARD.encode("no-separator")),
            ..Default::default()
        };
        assert!(decode_entry(&entry).is_none());
    }

    #[test]
    fn decode_password_may_contain_colons() {
        let entry = AuthEntry {
            auth: Some(STANDARD.encode("user:pa:ss")),
            ..Default::default()
        };
        let credential = decode_entry(&entry).unwrap();
        assert_eq!(credential.username, "user");
        assert_eq!(credential.password.expose_secret(), "pa:ss");
    }
}
