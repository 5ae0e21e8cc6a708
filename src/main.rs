use std::path::{Path, PathBuf};

use agricraft_lib::classify::{Classifier, GeminiClassifier};
use agricraft_lib::config::AppConfig;
use agricraft_lib::media::{self, ImageAsset};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "agricraft")]
#[command(about = "Compress and classify agricultural waste photos for the AgriCraft marketplace")]
#[command(version = VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that an image would be accepted for upload
    Validate {
        /// Image file
        file: PathBuf,
    },

    /// Re-encode an image under the upload size budget
    Compress {
        /// Image file
        file: PathBuf,
        /// Where to write the result (defaults to compressed_<name> next to the input)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Byte budget (overrides configuration)
        #[arg(long)]
        max_bytes: Option<u64>,
        /// Longer-edge limit in pixels (overrides configuration)
        #[arg(long)]
        max_dimension: Option<u32>,
    },

    /// Classify a waste photo and print the result as JSON
    Classify {
        /// Image file
        file: PathBuf,
        /// Classification endpoint (overrides configuration)
        #[arg(long, env = "AGRICRAFT_AI_ENDPOINT")]
        endpoint: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { file } => validate(&file),
        Commands::Compress {
            file,
            output,
            max_bytes,
            max_dimension,
        } => compress(&file, output, max_bytes, max_dimension),
        Commands::Classify { file, endpoint } => classify(&file, endpoint).await,
        Commands::Version => {
            println!("AgriCraft v{}", VERSION);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn validate(file: &Path) -> Result<()> {
    let asset = ImageAsset::from_path(file)?;
    media::validate_image_file(&asset)?;
    println!("{} ({}, {} bytes) is valid", asset.name, asset.media_type, asset.size());
    Ok(())
}

fn compress(
    file: &Path,
    output: Option<PathBuf>,
    max_bytes: Option<u64>,
    max_dimension: Option<u32>,
) -> Result<()> {
    let config = AppConfig::load()?;
    let mut budget = config.budget();
    if let Some(max_bytes) = max_bytes {
        budget.max_bytes = max_bytes;
    }
    if let Some(max_dimension) = max_dimension {
        budget.max_dimension = max_dimension;
    }

    let asset = ImageAsset::from_path(file)?;
    media::validate_image_file(&asset)?;
    let original_size = asset.size();
    let compressed = media::compress(asset, &budget)?;

    let output =
        output.unwrap_or_else(|| file.with_file_name(format!("compressed_{}", compressed.name)));
    std::fs::write(&output, &compressed.bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} -> {} ({} -> {} bytes)",
        file.display(),
        output.display(),
        original_size,
        compressed.size()
    );
    Ok(())
}

async fn classify(file: &Path, endpoint: Option<String>) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(endpoint) = endpoint {
        config.ai_endpoint = endpoint;
    }

    let asset = ImageAsset::from_path(file)?;
    media::validate_image_file(&asset)?;
    let budget = config.budget();
    let asset = tokio::task::spawn_blocking(move || media::compress(asset, &budget)).await??;

    let record = GeminiClassifier::from_config(&config)
        .classify(&asset)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {e}", e.user_message()))?;

    let json = serde_json::to_string_pretty(&record).context("Serializing classification")?;
    println!("{json}");
    Ok(())
}
