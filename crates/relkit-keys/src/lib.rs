//! Signing key pair provisioning for relkit.
//!
//! [`KeyProvisioner::ensure_key_pair`] makes sure `<prefix>.key` and
//! `<prefix>.pub` exist. The first writer wins: once the private key file
//! is present, later calls never touch either file.
//!
//! ```text
//! ensure_key_pair(prefix)
//!   <prefix>.key exists? ── yes ──> KeyStatus::Existing
//!          │ no
//!   KeyGenerator::generate("")     (cosign-compatible ECDSA P-256)
//!   write <prefix>.key  mode 0700  (create-new)
//!   write <prefix>.pub  mode 0755
//!          └──> KeyStatus::Generated
//! ```

pub mod generator;
pub mod provision;

pub use generator::{CosignKeyGenerator, KeyGenerator, KeyPair};
pub use provision::{KeyError, KeyProvisioner, KeyStatus, PRIVATE_KEY_MODE, PUBLIC_KEY_MODE};
