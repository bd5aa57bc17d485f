//! Remote object store access.
//!
//! `ObjectStore` is the seam between the sync engine and the concrete
//! backend. The engine only ever needs three verbs; `SupabaseStore` maps
//! them onto Supabase's storage REST API, and tests substitute an
//! in-memory fake.

pub mod error;
mod supabase;
mod types;

pub use error::StorageError;
pub use supabase::SupabaseStore;
pub use types::{RemoteObject, UploadOptions};

use async_trait::async_trait;

/// Async interface to a flat object bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Full inventory of a bucket. Implementations must return the complete
    /// set, however many requests that takes; a truncated listing would get
    /// live objects pruned.
    async fn list(&self, bucket: &str) -> Result<Vec<RemoteObject>, StorageError>;

    /// Store `bytes` under `key`. With `options.upsert` off, the store
    /// rejects overwrites of an existing key.
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError>;

    /// Delete the given keys. Keys that no longer exist are not an error.
    async fn remove(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError>;
}
