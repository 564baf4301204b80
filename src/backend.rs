use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use reqwest::Client;
use tracing::debug;

use crate::conversation::Turn;
use crate::error::{ChatError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/api/chat";

/// Raw body chunks in the order the transport delivered them.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>>>;

/// Something that accepts the conversation and answers with a byte stream.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send the history. Resolves once the response head is in; a
    /// non-success status is an error.
    async fn open(&self, history: &[Turn]) -> Result<ChunkStream>;
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn open(&self, history: &[Turn]) -> Result<ChunkStream> {
        debug!(endpoint = %self.endpoint, turns = history.len(), "posting conversation");

        // `.json()` also sets `Content-Type: application/json`.
        let response = self
            .client
            .post(&self.endpoint)
            .json(history)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChatError::Status(response.status()));
        }

        let stream = response
            .bytes_stream()
            .map(|item| item.map(|bytes| bytes.to_vec()).map_err(ChatError::from))
            .boxed();
        Ok(stream)
    }
}
