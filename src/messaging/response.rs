//! Outbound response channel.
//!
//! A request's output is an ordered sequence of [`ResponseEvent`]s sent over
//! an mpsc channel: labelled text blocks and JSON payloads, chunks of one or
//! more text streams, and a final [`ResponseEvent::Done`]. The consuming
//! `complete` methods make "close once, complete once" a property of the
//! types rather than of the caller's discipline.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Label of the main answer stream.
pub const FINAL_RESPONSE: &str = "FINAL_RESPONSE";
/// Label of the "searching" notice.
pub const SEARCH_NOTIFICATION: &str = "SEARCH_NOTIFICATION";
/// Label of the search fallback notice.
pub const SEARCH_ERROR: &str = "SEARCH_ERROR";
/// Label of the structured search results payload.
pub const SEARCH_RESULTS: &str = "SEARCH_RESULTS";
/// Label used for request-fatal errors.
pub const ERROR: &str = "ERROR";

/// One outbound event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseEvent {
    /// A complete labelled text message.
    TextBlock {
        /// Event label.
        event_name: String,
        /// Message text.
        content: String,
    },
    /// A labelled structured payload.
    Json {
        /// Event label.
        event_name: String,
        /// Payload.
        payload: serde_json::Value,
    },
    /// One chunk of a text stream.
    TextChunk {
        /// Stream identifier.
        stream_id: String,
        /// Stream label.
        event_name: String,
        /// Chunk text.
        content: String,
    },
    /// A text stream was closed.
    StreamComplete {
        /// Stream identifier.
        stream_id: String,
        /// Stream label.
        event_name: String,
    },
    /// The request failed; no further answer will follow.
    Error {
        /// User-visible message.
        message: String,
    },
    /// The request is finished. Always the last event.
    Done,
}

/// Errors sending on the outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseError {
    /// The receiver was dropped.
    #[error("response channel closed")]
    ChannelClosed,
}

async fn send(tx: &mpsc::Sender<ResponseEvent>, event: ResponseEvent) -> Result<(), ResponseError> {
    tx.send(event).await.map_err(|_| ResponseError::ChannelClosed)
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Sender side of one request's output.
#[derive(Debug)]
pub struct ResponseHandler {
    tx: mpsc::Sender<ResponseEvent>,
}

impl ResponseHandler {
    /// Wrap an existing sender.
    pub fn new(tx: mpsc::Sender<ResponseEvent>) -> Self {
        Self { tx }
    }

    /// Handler plus the receiver its events arrive on.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ResponseEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Send a labelled text block.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn emit_text_block(&self, event_name: &str, content: &str) -> Result<(), ResponseError> {
        send(
            &self.tx,
            ResponseEvent::TextBlock {
                event_name: event_name.to_owned(),
                content: content.to_owned(),
            },
        )
        .await
    }

    /// Send a labelled JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn emit_json(
        &self,
        event_name: &str,
        payload: serde_json::Value,
    ) -> Result<(), ResponseError> {
        send(
            &self.tx,
            ResponseEvent::Json {
                event_name: event_name.to_owned(),
                payload,
            },
        )
        .await
    }

    /// Send a request-fatal error notice.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn emit_error(&self, message: &str) -> Result<(), ResponseError> {
        send(
            &self.tx,
            ResponseEvent::Error {
                message: message.to_owned(),
            },
        )
        .await
    }

    /// Open a new text stream labelled `event_name`.
    pub fn create_text_stream(&self, event_name: &str) -> TextStream {
        TextStream {
            stream_id: uuid::Uuid::new_v4().to_string(),
            event_name: event_name.to_owned(),
            tx: self.tx.clone(),
        }
    }

    /// Signal that the request is finished.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn complete(self) -> Result<(), ResponseError> {
        debug!("response complete");
        send(&self.tx, ResponseEvent::Done).await
    }
}

// ---------------------------------------------------------------------------
// Text stream
// ---------------------------------------------------------------------------

/// An open, labelled text stream.
#[derive(Debug)]
pub struct TextStream {
    stream_id: String,
    event_name: String,
    tx: mpsc::Sender<ResponseEvent>,
}

impl TextStream {
    /// Stream identifier carried by every chunk.
    pub fn id(&self) -> &str {
        &self.stream_id
    }

    /// Send one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn emit_chunk(&self, content: &str) -> Result<(), ResponseError> {
        send(
            &self.tx,
            ResponseEvent::TextChunk {
                stream_id: self.stream_id.clone(),
                event_name: self.event_name.clone(),
                content: content.to_owned(),
            },
        )
        .await
    }

    /// Close the stream.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::ChannelClosed`] if the receiver is gone.
    pub async fn complete(self) -> Result<(), ResponseError> {
        send(
            &self.tx,
            ResponseEvent::StreamComplete {
                stream_id: self.stream_id,
                event_name: self.event_name,
            },
        )
        .await
    }
}
