use thiserror::Error;

/// Errors from talking to the remote object store.
///
/// `Transport` means the request never produced an HTTP response; `Api`
/// means the store answered and said no. Listing callers treat every
/// variant as fatal, mutation callers log and move on.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("could not build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{operation} request for bucket '{bucket}' failed: {source}")]
    Transport {
        operation: &'static str,
        bucket: String,
        source: reqwest::Error,
    },

    #[error("{operation} for bucket '{bucket}' returned HTTP {status}: {message}")]
    Api {
        operation: &'static str,
        bucket: String,
        status: u16,
        message: String,
    },

    #[error("could not decode listing for bucket '{bucket}': {source}")]
    Decode {
        bucket: String,
        source: serde_json::Error,
    },
}
