use serde::{Deserialize, Serialize};

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "relkit.toml";

/// relkit.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelkitConfig {
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeysConfig {
    /// Path prefix for the key pair; `.key` and `.pub` are appended
    #[serde(default = "default_key_prefix")]
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Base image the application layer is stacked on
    #[serde(default = "default_base_image")]
    pub base_image: String,
    /// Target platform in `os/arch[/variant]` form
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Registry (and optional repository prefix) images are pushed to
    #[serde(default = "default_target_repo")]
    pub target_repo: String,
    /// Fixed part of the generated tag, followed by `-<unix seconds>`
    #[serde(default = "default_tag_prefix")]
    pub tag_prefix: String,
    /// Directory inside the image that receives the binary
    #[serde(default = "default_app_dir")]
    pub app_dir: String,
    /// Cargo profile used for the build
    #[serde(default = "default_profile")]
    pub profile: String,
    /// Rust target triple. When None, derived from `platform`.
    #[serde(default)]
    pub rust_target: Option<String>,
    /// Extra arguments appended to `cargo build` (e.g. `--features`)
    #[serde(default)]
    pub cargo_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registries reached over plain HTTP
    #[serde(default = "default_insecure_registries")]
    pub insecure: Vec<String>,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            prefix: default_key_prefix(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            base_image: default_base_image(),
            platform: default_platform(),
            target_repo: default_target_repo(),
            tag_prefix: default_tag_prefix(),
            app_dir: default_app_dir(),
            profile: default_profile(),
            rust_target: None,
            cargo_args: Vec::new(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            insecure: default_insecure_registries(),
        }
    }
}

impl RelkitConfig {
    /// Load from relkit.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config");
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

fn default_key_prefix() -> String {
    "release-sdk-testkey".to_owned()
}

fn default_base_image() -> String {
    "cgr.dev/chainguard/static:latest".to_owned()
}

fn default_platform() -> String {
    "linux/amd64".to_owned()
}

fn default_target_repo() -> String {
    "localhost:5000".to_owned()
}

fn default_tag_prefix() -> String {
    "test".to_owned()
}

fn default_app_dir() -> String {
    "/usr/local/bin".to_owned()
}

fn default_profile() -> String {
    "release".to_owned()
}

fn default_insecure_registries() -> Vec<String> {
    vec!["localhost:5000".to_owned()]
}
