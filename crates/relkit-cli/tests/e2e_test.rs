//! Live end-to-end run against a local registry.
//!
//! Needs a registry on `localhost:5000` (`docker run -d -p 5000:5000 registry:2`)
//! and the `x86_64-unknown-linux-musl` target installed.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
#[ignore = "needs a registry on localhost:5000 and the musl target"]
fn e2e_publishes_fixture_to_local_registry() {
    let tmp = TempDir::new().unwrap();
    let fixture = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/hello");

    cargo_bin_cmd!("relkit")
        .current_dir(tmp.path())
        .env("CARGO_TARGET_DIR", tmp.path().join("target"))
        .arg("e2e")
        .arg("hello")
        .arg("--source")
        .arg(&fixture)
        .args(["--repo", "localhost:5000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated key pair"))
        .stdout(predicate::str::is_match(r"localhost:5000/hello@sha256:[0-9a-f]{64}").unwrap());

    assert!(tmp.path().join("release-sdk-testkey.key").exists());
    assert!(tmp.path().join("release-sdk-testkey.pub").exists());
}
