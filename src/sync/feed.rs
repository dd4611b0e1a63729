//! Push feed transport - one SSE connection per viewed match

use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::config::Config;

/// Feed transport errors. None of these are fatal; the channel adapter
/// recovers by reconnecting.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("connection failed: {0}")]
    Connect(#[from] reqwest::Error),

    #[error("feed endpoint returned status {0}")]
    Status(u16),

    #[error("stream error: {0}")]
    Stream(String),
}

/// One live push connection scoped to a single match
#[async_trait]
pub trait EventFeed: Send {
    /// Next raw payload from the feed. `None` means the server closed the
    /// stream cleanly.
    async fn next_payload(&mut self) -> Option<Result<String, FeedError>>;
}

/// Opens feeds; the channel adapter reconnects through this after errors
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, match_id: Uuid) -> Result<Box<dyn EventFeed>, FeedError>;
}

/// SSE connector against the match server's per-match subscribe endpoint
pub struct SseConnector {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl SseConnector {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
        }
    }
}

#[async_trait]
impl FeedConnector for SseConnector {
    async fn connect(&self, match_id: Uuid) -> Result<Box<dyn EventFeed>, FeedError> {
        let url = format!("{}/matches/{}/subscribe", self.base_url, match_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.auth_token)
            .header("Accept", "text/event-stream")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        Ok(Box::new(SseFeed {
            stream: Box::pin(response.bytes_stream()),
            parser: SseParser::default(),
            queued: VecDeque::new(),
        }))
    }
}

/// Live SSE stream, decoded incrementally
pub struct SseFeed {
    stream: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    parser: SseParser,
    queued: VecDeque<String>,
}

#[async_trait]
impl EventFeed for SseFeed {
    async fn next_payload(&mut self) -> Option<Result<String, FeedError>> {
        loop {
            if let Some(payload) = self.queued.pop_front() {
                return Some(Ok(payload));
            }
            match self.stream.next().await {
                Some(Ok(chunk)) => self.queued.extend(self.parser.push(&chunk)),
                Some(Err(e)) => return Some(Err(FeedError::Stream(e.to_string()))),
                None => return None,
            }
        }
    }
}

/// Incremental `text/event-stream` parser.
///
/// Accumulates raw bytes and emits the concatenated data lines of each
/// complete event block. Buffering stays at the byte level because the
/// network may split a multi-byte UTF-8 character across chunks; text
/// decoding only ever sees complete blocks. Carriage returns are stripped
/// up front; payloads are JSON and never contain raw CRs.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        // 0x0D never occurs inside a multi-byte UTF-8 sequence, so this
        // byte-level strip is safe.
        self.buffer
            .extend(chunk.iter().copied().filter(|&b| b != b'\r'));

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let block: Vec<u8> = self.buffer.drain(..pos + 2).collect();
            let block = String::from_utf8_lossy(&block);
            let data: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .collect();
            if !data.is_empty() {
                payloads.push(data.join("\n"));
            }
        }
        payloads
    }
}
