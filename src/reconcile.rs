//! Decides what has to change remotely for a bucket to mirror a directory.
//!
//! Pure comparison over the two inventories; no IO, no store access, so
//! every decision rule is testable without a runtime.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::local::LocalFile;
use crate::storage::RemoteObject;

/// The actions a pipeline will execute, in execution order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SyncPlan {
    /// Local files with no remote counterpart.
    pub to_upload: Vec<String>,
    /// Files modified locally after the remote copy was written.
    pub to_refresh: Vec<String>,
    /// Remote objects with no local counterpart.
    pub to_prune: Vec<String>,
}

impl SyncPlan {
    pub fn is_empty(&self) -> bool {
        self.to_upload.is_empty() && self.to_refresh.is_empty() && self.to_prune.is_empty()
    }
}

/// Compare the two inventories by filename.
///
/// A file earns a refresh only when its local mtime is strictly newer than
/// the remote `updated_at`; equal timestamps leave the object alone.
/// Ordering is deterministic: uploads and refreshes follow `local`, prunes
/// follow `remote`.
pub fn reconcile(local: &[LocalFile], remote: &[RemoteObject]) -> SyncPlan {
    let remote_by_name: HashMap<&str, DateTime<Utc>> = remote
        .iter()
        .map(|object| (object.name.as_str(), object.updated_at))
        .collect();
    let local_names: HashSet<&str> = local.iter().map(|file| file.name.as_str()).collect();

    let mut plan = SyncPlan::default();

    for file in local {
        match remote_by_name.get(file.name.as_str()) {
            None => plan.to_upload.push(file.name.clone()),
            Some(updated_at) if file.modified > *updated_at => {
                plan.to_refresh.push(file.name.clone())
            }
            Some(_) => {}
        }
    }

    for object in remote {
        if !local_names.contains(object.name.as_str()) {
            plan.to_prune.push(object.name.clone());
        }
    }

    plan
}
