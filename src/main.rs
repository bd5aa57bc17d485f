//! blogsync-rs — one-way sync of a local blog into Supabase Storage.
//!
//! Reads two local directories (markdown posts and images), compares each
//! against its bucket by modification time, and uploads, refreshes, or
//! prunes remote objects until the bucket mirrors the directory. The posts
//! pipeline runs to completion before the images pipeline starts.

#![warn(clippy::all)]

mod cli;
mod config;
mod local;
mod reconcile;
mod storage;
mod sync;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use storage::SupabaseStore;
use sync::{ContentTypeRule, PipelineConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    // The default .env is optional (the environment may already be
    // populated), but a file named explicitly has to exist.
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_filename(path)
                .with_context(|| format!("could not load env file {}", path))?;
            tracing::debug!("Loaded environment from {}", path);
        }
        None => match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) => tracing::debug!("No .env file loaded: {}", e),
        },
    }

    let config = config::Config::from_env()?;
    tracing::debug!(?config, "Configuration loaded");

    let store = SupabaseStore::new(&config.endpoint, config.service_key)?;

    let pipelines = [
        PipelineConfig {
            label: "posts",
            local_dir: config.content_dir,
            bucket: config.content_bucket,
            suffix: Some(".md"),
            content_type: ContentTypeRule::StoreDefault,
        },
        PipelineConfig {
            label: "images",
            local_dir: config.image_dir,
            bucket: config.image_bucket,
            suffix: None,
            content_type: ContentTypeRule::ImageFromExtension,
        },
    ];

    // Strictly one pipeline after the other: the images pass must not
    // start listing until the posts pass has finished its prunes.
    let mut any_failures = false;
    for pipeline in &pipelines {
        tracing::info!(
            "Syncing {} from {} into bucket '{}'",
            pipeline.label,
            pipeline.local_dir.display(),
            pipeline.bucket
        );
        let stats = sync::run_pipeline(&store, pipeline, cli.dry_run).await?;
        any_failures |= stats.has_failures();
    }

    if cli.dry_run {
        tracing::info!("Dry run complete, no changes made");
    } else if any_failures {
        tracing::warn!("Sync complete with failures, see log above");
    } else {
        tracing::info!("Sync complete");
    }

    Ok(())
}
