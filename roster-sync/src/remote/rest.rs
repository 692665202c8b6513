//! REST implementation of the remote store.
//!
//! Talks to a PostgREST-style data API (`/rest/v1/<table>`) for queries and
//! mutations, and reads the realtime change feed as newline-delimited JSON
//! frames from `/realtime/v1/changes`.

use super::{ChangeFeed, FEED_BUFFER, RemoteStore};
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder, Response};
use roster_types::{ChangeEvent, ChangePayload, NewRecord, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// REST backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestConfig {
    /// Base URL of the project (e.g. `https://abc.example.co`).
    pub base_url: String,
    /// Public API key, sent as `apikey` and as the bearer token.
    pub api_key: String,
    /// Database schema the table lives in.
    pub schema: String,
    /// Timeout for query and mutation calls. The change feed has none.
    pub request_timeout_secs: u64,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            schema: "public".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// PostgREST error body.
#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Remote store reached over HTTP.
pub struct RestStore {
    config: RestConfig,
    client: Client,
}

impl RestStore {
    /// Creates a new REST store.
    pub fn new(config: RestConfig) -> SyncResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(SyncError::Config("base URL is empty".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base(), urlencoding::encode(table))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

/// Maps a non-success response to [`SyncError::Remote`], preferring the
/// API's own error message over the raw body.
async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(SyncError::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteStore for RestStore {
    fn provider_name(&self) -> &'static str {
        "PostgREST"
    }

    async fn fetch_all(&self, table: &str) -> SyncResult<Vec<Record>> {
        debug!("Fetching all rows of {}", table);

        let response = self
            .authorized(self.client.get(self.table_url(table)))
            .header("Accept-Profile", &self.config.schema)
            .query(&[("select", "*"), ("order", "created_at.asc")])
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("bulk query failed: {e}")))?;

        let records: Vec<Record> = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("failed to parse rows: {e}")))?;

        debug!("Fetched {} rows of {}", records.len(), table);
        Ok(records)
    }

    async fn insert(&self, table: &str, record: &NewRecord) -> SyncResult<()> {
        debug!("Inserting into {}: {}", table, record.custom_id);

        let response = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Content-Profile", &self.config.schema)
            .header("Prefer", "return=minimal")
            .json(&[record])
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("insert failed: {e}")))?;

        check_status(response).await?;
        info!("Inserted row into {} (custom_id: {})", table, record.custom_id);
        Ok(())
    }

    async fn delete(&self, table: &str, id: &RecordId) -> SyncResult<()> {
        debug!("Deleting from {}: {}", table, id);

        let response = self
            .authorized(self.client.delete(self.table_url(table)))
            .header("Content-Profile", &self.config.schema)
            .query(&[("id", format!("eq.{id}"))])
            .timeout(self.timeout())
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("delete failed: {e}")))?;

        check_status(response).await?;
        info!("Deleted row {} from {}", id, table);
        Ok(())
    }

    async fn subscribe(&self, table: &str) -> SyncResult<ChangeFeed> {
        let url = format!("{}/realtime/v1/changes", self.base());
        let response = self
            .authorized(self.client.get(url))
            .header("Accept", "application/x-ndjson")
            .query(&[("schema", self.config.schema.as_str()), ("table", table)])
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("subscribe failed: {e}")))?;
        let response = check_status(response).await?;

        info!("Subscribed to changes on {}.{}", self.config.schema, table);

        let (tx, rx) = mpsc::channel(FEED_BUFFER);
        let table = table.to_string();
        tokio::spawn(async move {
            let mut body = Box::pin(response.bytes_stream());
            let mut frames = FrameBuffer::default();

            'read: while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!("Change feed for {} interrupted: {e}", table);
                        break;
                    }
                };
                for line in frames.push(&chunk) {
                    if !forward_frame(&line, &tx).await {
                        break 'read;
                    }
                }
            }
            if let Some(line) = frames.finish() {
                forward_frame(&line, &tx).await;
            }

            info!("Change feed for {} closed", table);
        });

        Ok(rx)
    }
}

/// Decodes one frame and forwards it. Returns false once the consumer has
/// gone away.
async fn forward_frame(line: &[u8], tx: &mpsc::Sender<ChangeEvent>) -> bool {
    match decode_frame(line) {
        Some(Ok(event)) => {
            debug!("Feed delivered {} event", event.kind());
            tx.send(event).await.is_ok()
        }
        Some(Err(e)) => {
            warn!("Skipping malformed change frame: {e}");
            true
        }
        None => true,
    }
}

/// Decodes one feed line. Blank lines are keep-alives and yield `None`.
pub fn decode_frame(line: &[u8]) -> Option<SyncResult<ChangeEvent>> {
    let text = match std::str::from_utf8(line) {
        Ok(text) => text.trim(),
        Err(e) => return Some(Err(SyncError::Network(format!("frame is not UTF-8: {e}")))),
    };
    if text.is_empty() {
        return None;
    }
    Some(
        ChangePayload::from_json(text)
            .and_then(ChangePayload::into_event)
            .map_err(SyncError::from),
    )
}

/// Splits a byte stream into newline-terminated frames.
#[derive(Debug, Default)]
struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    /// Appends bytes and returns every complete line, without terminators.
    fn push(&mut self, bytes: &[u8]) -> Vec<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            lines.push(line);
        }
        lines
    }

    /// Returns the trailing unterminated line, if any.
    fn finish(self) -> Option<Vec<u8>> {
        (!self.pending.is_empty()).then_some(self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::FrameBuffer;

    #[test]
    fn frames_split_across_chunks() {
        let mut frames = FrameBuffer::default();
        assert!(frames.push(b"{\"a\":").is_empty());
        let lines = frames.push(b"1}\n{\"b\":2}\n{\"c\"");
        assert_eq!(lines, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
        assert_eq!(frames.finish(), Some(b"{\"c\"".to_vec()));
    }

    #[test]
    fn empty_buffer_has_no_tail() {
        let mut frames = FrameBuffer::default();
        assert_eq!(frames.push(b"\n"), vec![Vec::<u8>::new()]);
        assert_eq!(frames.finish(), None);
    }
}
