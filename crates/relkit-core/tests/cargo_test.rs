use relkit_core::CargoProject;
use std::path::Path;
use tempfile::TempDir;

/// Create a minimal Cargo project in a directory.
fn init_cargo_project(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir.join("src")).unwrap();
    std::fs::write(
        dir.join("Cargo.toml"),
        format!(
            r#"[package]
name = "{name}"
version = "1.2.3"
edition = "2021"
"#
        ),
    )
    .unwrap();
    std::fs::write(dir.join("src/main.rs"), "fn main() {}\n").unwrap();
}

/// Workspace with members under `crates/`.
fn init_workspace(dir: &Path, members: &[&str]) {
    let list = members
        .iter()
        .map(|m| format!("\"crates/{m}\""))
        .collect::<Vec<_>>()
        .join(", ");
    std::fs::write(
        dir.join("Cargo.toml"),
        format!(
            r#"[workspace]
members = [{list}]

[workspace.package]
version = "2.0.0"
edition = "2021"
"#
        ),
    )
    .unwrap();

    for member in members {
        let member_dir = dir.join("crates").join(member);
        std::fs::create_dir_all(member_dir.join("src")).unwrap();
        std::fs::write(
            member_dir.join("Cargo.toml"),
            format!(
                r#"[package]
name = "{member}"
version.workspace = true
edition.workspace = true
"#
            ),
        )
        .unwrap();
        std::fs::write(member_dir.join("src/main.rs"), "fn main() {}\n").unwrap();
    }
}

// ── Single package ──

#[test]
fn resolve_by_package_name() {
    let tmp = TempDir::new().unwrap();
    init_cargo_project(tmp.path(), "hello");

    let project = CargoProject::resolve(tmp.path(), "hello").unwrap();

    assert_eq!(project.name, "hello");
    assert_eq!(project.version, "1.2.3");
    assert_eq!(project.default_binary, "hello");
    assert_eq!(project.binaries.len(), 1);
    assert!(project.manifest_path.ends_with("Cargo.toml"));
    assert_eq!(project.package_dir, project.workspace_root);
    assert!(project.target_directory.ends_with("target"));
}

#[test]
fn resolve_dot_selects_root_package() {
    let tmp = TempDir::new().unwrap();
    init_cargo_project(tmp.path(), "root-app");

    let project = CargoProject::resolve(tmp.path(), ".").unwrap();
    assert_eq!(project.name, "root-app");
}

#[test]
fn resolve_accepts_cargo_scheme() {
    let tmp = TempDir::new().unwrap();
    init_cargo_project(tmp.path(), "hello");

    let project = CargoProject::resolve(tmp.path(), "cargo://hello").unwrap();
    assert_eq!(project.name, "hello");
}

// ── Workspace ──

#[test]
fn resolve_workspace_member_by_name() {
    let tmp = TempDir::new().unwrap();
    init_workspace(tmp.path(), &["api", "worker"]);

    let project = CargoProject::resolve(tmp.path(), "worker").unwrap();

    assert_eq!(project.name, "worker");
    // Version inherited from the workspace
    assert_eq!(project.version, "2.0.0");
    assert_eq!(
        project.workspace_root.canonicalize().unwrap(),
        tmp.path().canonicalize().unwrap()
    );
}

#[test]
fn resolve_workspace_member_by_relative_dir() {
    let tmp = TempDir::new().unwrap();
    init_workspace(tmp.path(), &["api", "worker"]);

    let project = CargoProject::resolve(tmp.path(), "crates/api/").unwrap();
    assert_eq!(project.name, "api");
    assert!(project.package_dir.ends_with("crates/api"));
}

#[test]
fn resolve_unknown_import_path_lists_members() {
    let tmp = TempDir::new().unwrap();
    init_workspace(tmp.path(), &["api"]);

    let err = CargoProject::resolve(tmp.path(), "golang.org/x/example/hello")
        .unwrap_err()
        .to_string();
    assert!(err.contains("matches no package"), "got: {err}");
    assert!(err.contains("api"), "should list workspace members, got: {err}");
}

// ── Error cases ──

#[test]
fn resolve_no_cargo_toml() {
    let tmp = TempDir::new().unwrap();

    let err = CargoProject::resolve(tmp.path(), "hello")
        .unwrap_err()
        .to_string();
    assert!(err.contains("cargo metadata"), "got: {err}");
}

#[test]
fn resolve_lib_only_errors() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::write(
        tmp.path().join("Cargo.toml"),
        r#"[package]
name = "lib-only"
version = "0.1.0"
edition = "2021"
"#,
    )
    .unwrap();
    std::fs::write(tmp.path().join("src/lib.rs"), "pub fn hello() {}\n").unwrap();

    let err = CargoProject::resolve(tmp.path(), "lib-only")
        .unwrap_err()
        .to_string();
    assert!(err.contains("no binary target"), "got: {err}");
}

#[test]
fn resolve_multiple_binaries_with_default_run() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("src/bin")).unwrap();
    std::fs::write(
        tmp.path().join("Cargo.toml"),
        r#"[package]
name = "multi"
version = "0.1.0"
edition = "2021"
default-run = "worker"
"#,
    )
    .unwrap();
    std::fs::write(tmp.path().join("src/bin/server.rs"), "fn main() {}\n").unwrap();
    std::fs::write(tmp.path().join("src/bin/worker.rs"), "fn main() {}\n").unwrap();

    let project = CargoProject::resolve(tmp.path(), "multi").unwrap();

    assert_eq!(project.default_binary, "worker");
    assert_eq!(project.binaries.len(), 2);
}
