//! Sync engine — lists both sides, reconciles, then applies the plan one
//! action at a time: uploads first, then refreshes, then prunes.
//!
//! Failures on a single object are logged and counted but never stop the
//! run; only a failed listing is fatal, because acting on an incomplete
//! inventory could prune live objects.

pub mod error;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::local;
use crate::reconcile::reconcile;
use crate::storage::{ObjectStore, UploadOptions};

pub use error::SyncError;

use error::ActionError;

/// How the upload content type is chosen for a pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContentTypeRule {
    /// Send none and let the store apply its default.
    StoreDefault,
    /// `image/<ext>`, where `<ext>` is everything after the last dot.
    ImageFromExtension,
}

/// One pipeline's inputs: a local directory mirrored into one bucket.
#[derive(Debug)]
pub struct PipelineConfig {
    pub label: &'static str,
    pub local_dir: PathBuf,
    pub bucket: String,
    /// Keep only filenames with this suffix, on both sides.
    pub suffix: Option<&'static str>,
    pub content_type: ContentTypeRule,
}

/// Outcome counters for one pipeline run. Each synced name lands in
/// exactly one counter.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PipelineStats {
    pub uploaded: usize,
    pub refreshed: usize,
    /// Refreshes whose remove succeeded but whose re-upload failed; the
    /// object is absent remotely until the next run.
    pub refresh_partial: usize,
    pub pruned: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl PipelineStats {
    /// True when any object failed to reach its mirrored state this run.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.refresh_partial > 0
    }
}

/// Mirror one local directory into one bucket.
///
/// With `dry_run` set, both listings and the plan are computed but no
/// store call is made; the stats then count planned actions.
pub async fn run_pipeline(
    store: &dyn ObjectStore,
    config: &PipelineConfig,
    dry_run: bool,
) -> Result<PipelineStats, SyncError> {
    let started = Instant::now();

    let mut remote = store
        .list(&config.bucket)
        .await
        .map_err(|source| SyncError::RemoteList {
            bucket: config.bucket.clone(),
            source,
        })?;
    if let Some(suffix) = config.suffix {
        remote.retain(|object| object.name.ends_with(suffix));
    }

    let local = local::list_dir(&config.local_dir, config.suffix).map_err(|source| {
        SyncError::LocalList {
            path: config.local_dir.clone(),
            source,
        }
    })?;

    let plan = reconcile(&local, &remote);
    info!(
        "{}: {} local, {} remote; planning {} uploads, {} refreshes, {} prunes",
        config.label,
        local.len(),
        remote.len(),
        plan.to_upload.len(),
        plan.to_refresh.len(),
        plan.to_prune.len(),
    );

    let mut stats = PipelineStats {
        unchanged: local.len() - plan.to_upload.len() - plan.to_refresh.len(),
        ..PipelineStats::default()
    };

    if dry_run {
        for name in &plan.to_upload {
            info!(
                "[dry-run] {}: would upload {} to bucket '{}'",
                config.label, name, config.bucket
            );
        }
        for name in &plan.to_refresh {
            info!(
                "[dry-run] {}: would refresh {} in bucket '{}'",
                config.label, name, config.bucket
            );
        }
        for name in &plan.to_prune {
            info!(
                "[dry-run] {}: would prune {} from bucket '{}'",
                config.label, name, config.bucket
            );
        }
        stats.uploaded = plan.to_upload.len();
        stats.refreshed = plan.to_refresh.len();
        stats.pruned = plan.to_prune.len();
        info!("── {} dry-run summary ──", config.label);
        info!(
            "  {} to upload, {} to refresh, {} to prune, {} unchanged",
            stats.uploaded, stats.refreshed, stats.pruned, stats.unchanged
        );
        return Ok(stats);
    }

    for name in &plan.to_upload {
        match upload_one(store, config, name).await {
            Ok(()) => {
                info!("{}: uploaded {} to bucket '{}'", config.label, name, config.bucket);
                stats.uploaded += 1;
            }
            Err(e) => {
                error!("{}: upload of {} failed: {}", config.label, name, e);
                stats.failed += 1;
            }
        }
    }

    for name in &plan.to_refresh {
        // The store rejects overwrites, so a refresh must remove the old
        // copy first. Between the two calls the object does not exist.
        if let Err(e) = store.remove(&config.bucket, std::slice::from_ref(name)).await {
            error!(
                "{}: refresh of {} failed removing the old copy: {}",
                config.label, name, e
            );
            stats.failed += 1;
            continue;
        }
        match upload_one(store, config, name).await {
            Ok(()) => {
                info!("{}: refreshed {} in bucket '{}'", config.label, name, config.bucket);
                stats.refreshed += 1;
            }
            Err(e) => {
                error!(
                    "{}: refresh of {} removed the old copy but could not upload the new one: {}",
                    config.label, name, e
                );
                stats.refresh_partial += 1;
            }
        }
    }

    for name in &plan.to_prune {
        match store.remove(&config.bucket, std::slice::from_ref(name)).await {
            Ok(()) => {
                info!("{}: pruned {} from bucket '{}'", config.label, name, config.bucket);
                stats.pruned += 1;
            }
            Err(e) => {
                error!("{}: prune of {} failed: {}", config.label, name, e);
                stats.failed += 1;
            }
        }
    }

    log_summary(config.label, &stats, started.elapsed());
    Ok(stats)
}

/// Read the file and push it. A read failure counts as that object's
/// upload failure, the same as a rejected request.
async fn upload_one(
    store: &dyn ObjectStore,
    config: &PipelineConfig,
    name: &str,
) -> Result<(), ActionError> {
    let path = config.local_dir.join(name);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|source| ActionError::ReadFile { path, source })?;
    let options = UploadOptions {
        content_type: content_type_for(config.content_type, name),
        ..UploadOptions::default()
    };
    store.upload(&config.bucket, name, bytes, &options).await?;
    Ok(())
}

/// Content type sent with an upload, per the pipeline's rule.
///
/// The image rule trusts the filename: everything after the last dot
/// becomes the subtype verbatim, so `photo.png` is `image/png` and
/// `archive.zip` is `image/zip`. No validation, no case folding.
fn content_type_for(rule: ContentTypeRule, name: &str) -> Option<String> {
    match rule {
        ContentTypeRule::StoreDefault => None,
        ContentTypeRule::ImageFromExtension => {
            let ext = name.rsplit('.').next().unwrap_or(name);
            Some(format!("image/{ext}"))
        }
    }
}

fn log_summary(label: &str, stats: &PipelineStats, elapsed: Duration) {
    info!("── {} summary ──", label);
    info!(
        "  {} uploaded, {} refreshed, {} pruned, {} unchanged, {} failed",
        stats.uploaded, stats.refreshed, stats.pruned, stats.unchanged, stats.failed
    );
    if stats.refresh_partial > 0 {
        warn!(
            "  {} refreshes removed their old copy but could not upload the new one",
            stats.refresh_partial
        );
    }
    info!("  elapsed: {:.1?}", elapsed);
}
