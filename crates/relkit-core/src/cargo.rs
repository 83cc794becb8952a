//! Import path resolution via `cargo metadata`.
//!
//! An import path names the package to build inside a source tree. It is
//! either the package name (`hello`) or the package directory relative to
//! the workspace root (`crates/hello`). A leading `cargo://` scheme is
//! accepted and ignored, so references copied from build manifests work
//! unchanged.

use cargo_metadata::{Metadata, MetadataCommand, Package, TargetKind};
use std::path::{Path, PathBuf};

const IMPORT_SCHEME: &str = "cargo://";

/// A binary target in a Cargo package.
///
/// # Examples
///
/// ```
/// use relkit_core::CargoBinary;
/// use std::path::PathBuf;
///
/// let bin = CargoBinary {
///     name: "hello".to_owned(),
///     src_path: PathBuf::from("src/main.rs"),
/// };
/// assert_eq!(bin.name, "hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoBinary {
    /// Binary name (used with `cargo build --bin <name>`)
    pub name: String,
    /// Absolute path to the source file
    pub src_path: PathBuf,
}

/// The package an import path resolved to.
///
/// All fields are resolved by Cargo itself, so workspace members with
/// inherited fields and custom target directories are handled.
///
/// # Examples
///
/// ```no_run
/// use relkit_core::CargoProject;
/// use std::path::Path;
///
/// let project = CargoProject::resolve(Path::new("."), "hello").unwrap();
/// println!("building {} v{}", project.name, project.version);
/// println!("binary: {}", project.default_binary);
/// ```
#[derive(Debug, Clone)]
pub struct CargoProject {
    /// Package name from `[package].name`
    pub name: String,
    /// Resolved version (handles `version.workspace = true`)
    pub version: String,
    /// Absolute path to the package's `Cargo.toml`
    pub manifest_path: PathBuf,
    /// Absolute path to the package directory (parent of `manifest_path`)
    pub package_dir: PathBuf,
    /// Absolute path to the workspace root directory
    pub workspace_root: PathBuf,
    /// Cargo's output directory (honours `CARGO_TARGET_DIR` and `build.target-dir`)
    pub target_directory: PathBuf,
    /// All binary targets in this package
    pub binaries: Vec<CargoBinary>,
    /// The binary that goes into the image.
    ///
    /// **Invariant:** must match a name in [`binaries`](Self::binaries).
    pub default_binary: String,
}

impl CargoProject {
    /// Resolve `import_path` against the Cargo workspace in `source_dir`.
    ///
    /// # Errors
    ///
    /// - [`Error::CargoMetadata`](crate::Error::CargoMetadata) if `cargo metadata` fails
    /// - [`Error::UnknownImportPath`](crate::Error::UnknownImportPath) if no package matches
    /// - [`Error::NoBinaryTarget`](crate::Error::NoBinaryTarget) if the package has no binary targets
    /// - [`Error::MultipleBinaries`](crate::Error::MultipleBinaries) if no binary can be selected
    pub fn resolve(source_dir: &Path, import_path: &str) -> crate::Result<Self> {
        let manifest_path = source_dir.join("Cargo.toml");
        tracing::debug!(path = %manifest_path.display(), import_path, "running cargo metadata");

        let metadata = MetadataCommand::new()
            .manifest_path(&manifest_path)
            .no_deps()
            .exec()
            .map_err(|e| crate::Error::CargoMetadata {
                manifest_path: manifest_path.clone(),
                detail: e.to_string(),
            })?;

        let package = Self::find_package(&metadata, import_path)?;

        let binaries: Vec<CargoBinary> = package
            .targets
            .iter()
            .filter(|t| t.kind.contains(&TargetKind::Bin))
            .map(|t| CargoBinary {
                name: t.name.clone(),
                src_path: PathBuf::from(t.src_path.as_std_path()),
            })
            .collect();

        let default_binary =
            Self::resolve_default_binary(&binaries, package.default_run.as_deref(), &package.name)?;

        let pkg_manifest = PathBuf::from(package.manifest_path.as_std_path());
        let pkg_dir = pkg_manifest
            .parent()
            .expect("manifest_path from cargo metadata is always absolute")
            .to_path_buf();
        let workspace_root = PathBuf::from(metadata.workspace_root.as_std_path());
        let target_directory = PathBuf::from(metadata.target_directory.as_std_path());

        tracing::debug!(
            name = %package.name,
            version = %package.version,
            binary = %default_binary,
            binaries = binaries.len(),
            target_directory = %target_directory.display(),
            "import path resolved"
        );

        Ok(Self {
            name: package.name.clone(),
            version: package.version.to_string(),
            manifest_path: pkg_manifest,
            package_dir: pkg_dir,
            workspace_root,
            target_directory,
            binaries,
            default_binary,
        })
    }

    /// Strip the optional scheme and path decoration from an import path.
    pub fn normalize_import_path(import_path: &str) -> &str {
        let path = import_path
            .strip_prefix(IMPORT_SCHEME)
            .unwrap_or(import_path)
            .trim_end_matches('/');
        let path = path.strip_prefix("./").unwrap_or(path);
        if path == "." { "" } else { path }
    }

    /// Match by package name first, then by directory relative to the
    /// workspace root.
    fn find_package<'m>(metadata: &'m Metadata, import_path: &str) -> crate::Result<&'m Package> {
        let wanted = Self::normalize_import_path(import_path);
        let root = metadata.workspace_root.as_std_path();

        let by_name = metadata.packages.iter().find(|p| p.name == wanted);
        let by_dir = || {
            metadata.packages.iter().find(|p| {
                p.manifest_path
                    .as_std_path()
                    .parent()
                    .and_then(|dir| dir.strip_prefix(root).ok())
                    .is_some_and(|rel| rel == Path::new(wanted))
            })
        };

        by_name
            .or_else(by_dir)
            .ok_or_else(|| crate::Error::UnknownImportPath {
                import_path: import_path.to_owned(),
                workspace_members: metadata
                    .packages
                    .iter()
                    .filter(|p| metadata.workspace_members.contains(&p.id))
                    .map(|p| p.name.clone())
                    .collect(),
            })
    }

    /// Select the binary to put in the image.
    ///
    /// Priority:
    /// 1. `default-run` from Cargo.toml (explicit user choice)
    /// 2. Single binary (unambiguous)
    /// 3. Binary matching the package name (Cargo convention)
    /// 4. Error with guidance
    fn resolve_default_binary(
        binaries: &[CargoBinary],
        default_run: Option<&str>,
        package_name: &str,
    ) -> crate::Result<String> {
        if let Some(name) = default_run
            && binaries.iter().any(|b| b.name == name)
        {
            return Ok(name.to_owned());
        }

        match binaries.len() {
            0 => Err(crate::Error::NoBinaryTarget {
                package: package_name.to_owned(),
            }),
            1 => Ok(binaries[0].name.clone()),
            _ => {
                if binaries.iter().any(|b| b.name == package_name) {
                    return Ok(package_name.to_owned());
                }
                Err(crate::Error::MultipleBinaries {
                    names: binaries.iter().map(|b| b.name.clone()).collect(),
                })
            }
        }
    }
}
