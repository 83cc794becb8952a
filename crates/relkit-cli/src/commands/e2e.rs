use crate::PublishArgs;
use relkit_core::RelkitConfig;
use relkit_keys::KeyProvisioner;
use std::path::{Path, PathBuf};

/// Key provisioning followed by a publish; stops at the first failure.
pub async fn e2e(args: PublishArgs, prefix: Option<PathBuf>) -> anyhow::Result<()> {
    let config = RelkitConfig::load(Path::new("."))?;
    let prefix = prefix.unwrap_or_else(|| PathBuf::from(&config.keys.prefix));

    let status = KeyProvisioner::new().ensure_key_pair(&prefix)?;
    super::keygen::report(&status);

    let reference = super::publish::run(&args).await?;
    println!("Published: {reference}");
    Ok(())
}
