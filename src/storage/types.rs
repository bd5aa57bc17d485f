use chrono::{DateTime, Utc};

/// One object in a bucket listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObject {
    pub name: String,
    pub updated_at: DateTime<Utc>,
}

/// Parameters forwarded with an upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Sent as the `content-type` header; `None` lets the store pick.
    pub content_type: Option<String>,
    /// Browser cache lifetime in seconds, sent as `cache-control: max-age=N`.
    pub cache_control: String,
    /// Whether an existing object under the same key may be overwritten.
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            cache_control: "3600".to_string(),
            upsert: false,
        }
    }
}
