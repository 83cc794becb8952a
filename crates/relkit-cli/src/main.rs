mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "relkit",
    about = "Provision signing keys and publish Cargo binaries as test images"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cosign key pair unless it already exists
    Keygen {
        /// Path prefix for the key files (.key and .pub are appended)
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
    /// Build a binary into an image and push it to the target registry
    Publish(PublishArgs),
    /// Provision keys, then publish, as the end-to-end tests do
    E2e {
        #[command(flatten)]
        publish: PublishArgs,
        /// Path prefix for the key files
        #[arg(long)]
        prefix: Option<PathBuf>,
    },
}

#[derive(Args)]
pub(crate) struct PublishArgs {
    /// Package name or package directory (optionally `cargo://`-prefixed)
    pub import_path: String,
    /// Directory holding the Cargo workspace
    #[arg(long, default_value = ".")]
    pub source: PathBuf,
    /// Base image to stack the binary on
    #[arg(long)]
    pub base: Option<String>,
    /// Registry (and optional repository prefix) to push to
    #[arg(long)]
    pub repo: Option<String>,
    /// Target platform, e.g. linux/arm64
    #[arg(long)]
    pub platform: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Keygen { prefix } => commands::keygen(prefix).await?,
        Commands::Publish(args) => commands::publish(args).await?,
        Commands::E2e { publish, prefix } => commands::e2e(publish, prefix).await?,
    }

    Ok(())
}
