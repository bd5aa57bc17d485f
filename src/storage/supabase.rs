//! Supabase Storage client.
//!
//! Talks to the storage REST API directly: listing is a POST carrying a
//! JSON query, uploads send the raw bytes, deletes carry the doomed keys
//! in the request body. Every request authenticates with the service role
//! key, so bucket policies never get in the way.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::StorageError;
use super::types::{RemoteObject, UploadOptions};
use super::ObjectStore;

/// Rows fetched per listing request. Paging continues until a short page.
const LIST_PAGE_SIZE: usize = 100;

/// Whole-request deadline. The engine is strictly sequential, so a single
/// stalled connection would otherwise hang the run with no way out.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for SupabaseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Row shape returned by the list endpoint. Folder placeholders come back
/// with `id` and `updated_at` null.
#[derive(Debug, Deserialize)]
struct ObjectRow {
    name: String,
    id: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl SupabaseStore {
    /// Build a client for the given project endpoint.
    ///
    /// `endpoint` is the project root (`https://xyz.supabase.co`); the
    /// storage API lives under `/storage/v1`. A trailing slash is accepted.
    /// Requests time out after 30 seconds.
    pub fn new(endpoint: &str, service_key: String) -> Result<Self, StorageError> {
        Self::with_timeout(endpoint, service_key, REQUEST_TIMEOUT)
    }

    fn with_timeout(
        endpoint: &str,
        service_key: String,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let trimmed = endpoint.trim_end_matches('/');
        let url = reqwest::Url::parse(trimmed)
            .map_err(|e| StorageError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(StorageError::InvalidEndpoint(format!(
                "{endpoint}: expected an http(s) URL"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StorageError::Client)?;

        Ok(Self {
            http,
            base_url: format!("{trimmed}/storage/v1"),
            service_key,
        })
    }

    fn list_url(&self, bucket: &str) -> String {
        format!("{}/object/list/{}", self.base_url, bucket)
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, bucket, key)
    }

    fn bucket_url(&self, bucket: &str) -> String {
        format!("{}/object/{}", self.base_url, bucket)
    }

    /// Start a request with the auth headers every storage call needs.
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.service_key)
            .header("apikey", self.service_key.as_str())
    }
}

#[async_trait]
impl ObjectStore for SupabaseStore {
    async fn list(&self, bucket: &str) -> Result<Vec<RemoteObject>, StorageError> {
        let url = self.list_url(bucket);
        let mut objects = Vec::new();
        let mut offset = 0usize;

        loop {
            let body = json!({
                "prefix": "",
                "limit": LIST_PAGE_SIZE,
                "offset": offset,
                "sortBy": { "column": "name", "order": "asc" },
            });
            let response = self
                .request(reqwest::Method::POST, &url)
                .json(&body)
                .send()
                .await
                .map_err(|source| StorageError::Transport {
                    operation: "list",
                    bucket: bucket.to_string(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(StorageError::Api {
                    operation: "list",
                    bucket: bucket.to_string(),
                    status: status.as_u16(),
                    message: error_message(response).await,
                });
            }

            let text = response
                .text()
                .await
                .map_err(|source| StorageError::Transport {
                    operation: "list",
                    bucket: bucket.to_string(),
                    source,
                })?;
            let rows: Vec<ObjectRow> =
                serde_json::from_str(&text).map_err(|source| StorageError::Decode {
                    bucket: bucket.to_string(),
                    source,
                })?;

            debug!("Bucket '{}': {} rows at offset {}", bucket, rows.len(), offset);
            let page_len = rows.len();
            for row in rows {
                match (row.id.as_ref(), row.updated_at) {
                    (Some(_), Some(updated_at)) => objects.push(RemoteObject {
                        name: row.name,
                        updated_at,
                    }),
                    // Folder placeholders carry no timestamp to compare against.
                    _ => debug!("Ignoring listing row '{}' without object metadata", row.name),
                }
            }

            if page_len < LIST_PAGE_SIZE {
                break;
            }
            offset += page_len;
        }

        Ok(objects)
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
    ) -> Result<(), StorageError> {
        let url = self.object_url(bucket, key);
        let mut request = self
            .request(reqwest::Method::POST, &url)
            .header("cache-control", format!("max-age={}", options.cache_control))
            .header("x-upsert", if options.upsert { "true" } else { "false" });
        if let Some(content_type) = &options.content_type {
            request = request.header("content-type", content_type.as_str());
        }

        let response =
            request
                .body(bytes)
                .send()
                .await
                .map_err(|source| StorageError::Transport {
                    operation: "upload",
                    bucket: bucket.to_string(),
                    source,
                })?;
        check_status(response, "upload", bucket).await
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> Result<(), StorageError> {
        let url = self.bucket_url(bucket);
        let body = json!({ "prefixes": keys });
        let response = self
            .request(reqwest::Method::DELETE, &url)
            .json(&body)
            .send()
            .await
            .map_err(|source| StorageError::Transport {
                operation: "remove",
                bucket: bucket.to_string(),
                source,
            })?;
        check_status(response, "remove", bucket).await
    }
}

async fn check_status(
    response: reqwest::Response,
    operation: &'static str,
    bucket: &str,
) -> Result<(), StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(StorageError::Api {
        operation,
        bucket: bucket.to_string(),
        status: status.as_u16(),
        message: error_message(response).await,
    })
}

async fn error_message(response: reqwest::Response) -> String {
    extract_error_message(&response.text().await.unwrap_or_default())
}

/// Error bodies look like `{"statusCode":"404","error":"...","message":"..."}`;
/// fall back to the raw body when the shape is anything else.
fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.to_string()),
        Err(_) => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use chrono::TimeZone;

    fn store() -> SupabaseStore {
        SupabaseStore::new("https://example.supabase.co", "key".to_string()).unwrap()
    }

    #[test]
    fn test_new_rejects_garbage_endpoint() {
        let err = SupabaseStore::new("not a url", "key".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_new_rejects_non_http_scheme() {
        let err = SupabaseStore::new("ftp://example.com", "key".to_string()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let store = SupabaseStore::new("https://example.supabase.co/", "key".to_string()).unwrap();
        assert_eq!(
            store.list_url("posts"),
            "https://example.supabase.co/storage/v1/object/list/posts"
        );
    }

    #[test]
    fn test_url_shapes() {
        let store = store();
        assert_eq!(
            store.list_url("posts"),
            "https://example.supabase.co/storage/v1/object/list/posts"
        );
        assert_eq!(
            store.object_url("images", "photo.png"),
            "https://example.supabase.co/storage/v1/object/images/photo.png"
        );
        assert_eq!(
            store.bucket_url("images"),
            "https://example.supabase.co/storage/v1/object/images"
        );
    }

    #[test]
    fn test_debug_omits_service_key() {
        let store =
            SupabaseStore::new("https://example.supabase.co", "sekrit-123".to_string()).unwrap();
        let rendered = format!("{:?}", store);
        assert!(!rendered.contains("sekrit-123"));
        assert!(rendered.contains("base_url"));
    }

    #[test]
    fn test_listing_row_decodes_full_shape() {
        let body = r#"[{
            "name": "hello-world.md",
            "id": "b92cb569-4b37-4e65-9a45-6e4a8f3c21de",
            "updated_at": "2024-01-15T10:30:00.000Z",
            "created_at": "2024-01-10T08:00:00.000Z",
            "last_accessed_at": "2024-01-15T10:30:00.000Z",
            "metadata": {"size": 2048, "mimetype": "text/markdown"}
        }]"#;
        let rows: Vec<ObjectRow> = serde_json::from_str(body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "hello-world.md");
        assert_eq!(
            rows[0].updated_at.unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_listing_row_tolerates_folder_placeholder() {
        let body = r#"[{"name": "drafts", "id": null, "updated_at": null}]"#;
        let rows: Vec<ObjectRow> = serde_json::from_str(body).unwrap();
        assert_eq!(rows[0].name, "drafts");
        assert!(rows[0].id.is_none());
        assert!(rows[0].updated_at.is_none());
    }

    #[test]
    fn test_extract_error_message_from_json_body() {
        let body = r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#;
        assert_eq!(extract_error_message(body), "The resource already exists");
    }

    #[test]
    fn test_extract_error_message_passthrough() {
        assert_eq!(extract_error_message("<html>nope</html>"), "<html>nope</html>");
        assert_eq!(
            extract_error_message(r#"{"error":"no message field"}"#),
            r#"{"error":"no message field"}"#
        );
    }

    /// One page of listing rows, shaped like the real endpoint's output.
    fn listing_page(start: usize, count: usize) -> String {
        let rows: Vec<serde_json::Value> = (start..start + count)
            .map(|i| {
                json!({
                    "name": format!("post-{i:03}.md"),
                    "id": format!("{i:08x}-0000-0000-0000-000000000000"),
                    "updated_at": "2024-01-15T10:30:00.000Z",
                })
            })
            .collect();
        serde_json::Value::Array(rows).to_string()
    }

    /// Serves one scripted page per connection and records each request's
    /// `offset`. Every response says `connection: close`, so the client
    /// opens a fresh connection per page.
    fn spawn_listing_server(pages: Vec<String>) -> (String, thread::JoinHandle<Vec<u64>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut offsets = Vec::new();
            for page in pages {
                let (mut stream, _) = listener.accept().unwrap();
                let body = read_request_body(&mut stream);
                let query: serde_json::Value = serde_json::from_str(&body).unwrap();
                offsets.push(query["offset"].as_u64().unwrap());
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{}",
                    page.len(),
                    page
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            offsets
        });
        (endpoint, handle)
    }

    fn read_request_body(stream: &mut TcpStream) -> String {
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            raw.extend_from_slice(&chunk[..n]);
            if let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&raw[..split]).to_lowercase();
                let length: usize = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse().unwrap())
                    .unwrap_or(0);
                let body_start = split + 4;
                if raw.len() >= body_start + length {
                    let body = &raw[body_start..body_start + length];
                    return String::from_utf8_lossy(body).into_owned();
                }
            }
            assert!(n > 0, "connection closed before the request arrived");
        }
    }

    #[tokio::test]
    async fn test_list_walks_pages_until_a_short_one() {
        let pages = vec![
            listing_page(0, LIST_PAGE_SIZE),
            listing_page(LIST_PAGE_SIZE, 1),
        ];
        let (endpoint, server) = spawn_listing_server(pages);
        let store = SupabaseStore::new(&endpoint, "key".to_string()).unwrap();

        let objects = store.list("posts").await.unwrap();

        assert_eq!(objects.len(), LIST_PAGE_SIZE + 1);
        assert_eq!(objects.first().unwrap().name, "post-000.md");
        assert_eq!(objects.last().unwrap().name, "post-100.md");
        assert_eq!(server.join().unwrap(), [0, 100]);
    }

    #[tokio::test]
    async fn test_stalled_request_times_out() {
        // Bound but never accepted: the connect succeeds, then nothing.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let store =
            SupabaseStore::with_timeout(&endpoint, "key".to_string(), Duration::from_millis(200))
                .unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), store.list("posts")).await;
        let err = result.expect("the request must fail, not hang").unwrap_err();
        assert!(matches!(err, StorageError::Transport { operation: "list", .. }));
    }
}
