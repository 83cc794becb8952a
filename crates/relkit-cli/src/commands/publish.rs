use crate::PublishArgs;
use relkit_core::{ImageReference, RelkitConfig};
use relkit_publish::Publisher;
use std::path::Path;

pub async fn publish(args: PublishArgs) -> anyhow::Result<()> {
    let reference = run(&args).await?;
    println!("{reference}");
    Ok(())
}

/// Load config, apply flag overrides, and run the publish flow.
pub(crate) async fn run(args: &PublishArgs) -> anyhow::Result<ImageReference> {
    let mut config = RelkitConfig::load(Path::new("."))?;
    if let Some(platform) = &args.platform {
        config.image.platform = platform.clone();
    }
    let base = args.base.as_deref().unwrap_or(&config.image.base_image);
    let repo = args.repo.as_deref().unwrap_or(&config.image.target_repo);

    let publisher = Publisher::new(&config)?;
    tracing::info!(
        import_path = %args.import_path,
        platform = %config.image.platform,
        %base,
        %repo,
        "publishing"
    );
    let reference = publisher
        .build_and_publish(&args.source, &args.import_path, base, repo)
        .await?;
    Ok(reference)
}
