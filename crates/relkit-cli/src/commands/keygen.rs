use relkit_core::RelkitConfig;
use relkit_keys::{KeyProvisioner, KeyStatus};
use std::path::{Path, PathBuf};

pub async fn keygen(prefix: Option<PathBuf>) -> anyhow::Result<()> {
    let config = RelkitConfig::load(Path::new("."))?;
    let prefix = prefix.unwrap_or_else(|| PathBuf::from(&config.keys.prefix));

    let status = KeyProvisioner::new().ensure_key_pair(&prefix)?;
    report(&status);
    Ok(())
}

pub(crate) fn report(status: &KeyStatus) {
    match status {
        KeyStatus::Generated { key_path, pub_path } => {
            println!("Generated key pair:");
            println!("  private: {}", key_path.display());
            println!("  public:  {}", pub_path.display());
        }
        KeyStatus::Existing { key_path } => {
            println!("Key pair already exists: {}", key_path.display());
        }
    }
}
