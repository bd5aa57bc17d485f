//! Local directory inventory.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

/// A regular file in a synced directory, keyed by filename.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile {
    pub name: String,
    pub modified: DateTime<Utc>,
}

/// List the regular files in `dir`, optionally keeping only names ending in
/// `suffix` (case-sensitive). Subdirectories and other non-file entries are
/// skipped; bucket key spaces are flat.
///
/// Fails on the first unreadable entry. Callers treat that as fatal: an
/// incomplete local inventory would make live remote objects look prunable.
pub fn list_dir(dir: &Path, suffix: Option<&str>) -> io::Result<Vec<LocalFile>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                // Object keys are UTF-8; nothing sensible to upload this as.
                warn!("Skipping non-UTF-8 filename {:?}", raw);
                continue;
            }
        };

        if let Some(suffix) = suffix {
            if !name.ends_with(suffix) {
                continue;
            }
        }

        let modified = entry.metadata()?.modified()?;
        files.push(LocalFile {
            name,
            modified: DateTime::<Utc>::from(modified),
        });
    }

    Ok(files)
}
