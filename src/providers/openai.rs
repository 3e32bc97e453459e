//! OpenAI-compatible provider using the `/chat/completions` API.
//!
//! Works against any server implementing the OpenAI chat wire format. The
//! streamed form consumes Server-Sent Events and forwards each
//! `choices[0].delta.content` fragment through an mpsc-backed stream.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tracing::{debug, warn};

use super::{
    check_http_response, CompletionRequest, CompletionResponse, FragmentStream, LlmProvider,
    ProviderError, Role, StopReason, UsageStats,
};

/// Fragment channel capacity for streamed completions.
const STREAM_CHANNEL_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Chat completions request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation messages.
    pub messages: Vec<OpenAiMessage>,
    /// Maximum completion tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether to stream the response as SSE.
    pub stream: bool,
}

/// A message in OpenAI chat format.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct OpenAiMessage {
    /// Role (`system` or `user`).
    pub role: String,
    /// Text content.
    pub content: String,
}

/// Chat completions response body.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponse {
    /// Response choices.
    pub choices: Vec<OpenAiChoice>,
    /// Model that served the response.
    #[serde(default)]
    pub model: String,
    /// Token usage.
    pub usage: Option<OpenAiUsage>,
}

/// A response choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiChoice {
    /// Assistant message for this choice.
    pub message: OpenAiResponseMessage,
    /// Why generation stopped.
    pub finish_reason: Option<String>,
}

/// Assistant message.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiResponseMessage {
    /// Optional text content.
    pub content: Option<String>,
}

/// Usage statistics.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiUsage {
    /// Prompt token count.
    pub prompt_tokens: Option<u32>,
    /// Completion token count.
    pub completion_tokens: Option<u32>,
}

/// One streamed chunk body (`data: {...}`).
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiStreamChunk {
    /// Delta choices.
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
}

/// A streamed delta choice.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct OpenAiStreamChoice {
    /// Incremental content.
    #[serde(default)]
    pub delta: OpenAiDelta,
}

/// Incremental message content.
#[doc(hidden)]
#[derive(Debug, Default, Deserialize)]
pub struct OpenAiDelta {
    /// Text fragment, absent on role-only or final deltas.
    pub content: Option<String>,
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// OpenAI-compatible chat completions provider.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    model_name: String,
    api_key: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("api_key", &"__REDACTED__")
            .finish()
    }
}

impl OpenAiCompatProvider {
    /// Create a provider for `model_name` served at `base_url`.
    pub fn new(base_url: String, model_name: String, api_key: String) -> Self {
        Self {
            base_url,
            model_name,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send(&self, body: &OpenAiRequest) -> Result<reqwest::Response, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await?;
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Request / Response builders (pub for integration testing)
// ---------------------------------------------------------------------------

/// Build a chat completions request from a completion request.
#[doc(hidden)]
pub fn build_request(model: &str, request: &CompletionRequest, stream: bool) -> OpenAiRequest {
    let mut messages: Vec<OpenAiMessage> = Vec::new();

    if let Some(system) = &request.system {
        messages.push(OpenAiMessage {
            role: role_to_openai(Role::System).to_owned(),
            content: system.clone(),
        });
    }

    for msg in &request.messages {
        messages.push(OpenAiMessage {
            role: role_to_openai(msg.role).to_owned(),
            content: msg.content.clone(),
        });
    }

    OpenAiRequest {
        model: model.to_owned(),
        messages,
        max_tokens: request.max_tokens,
        temperature: request.temperature,
        stream,
    }
}

/// Parse a non-streamed chat completions response.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if the body cannot be deserialized or has
/// no choices.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<CompletionResponse, ProviderError> {
    let resp: OpenAiResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Parse("missing choices[0]".to_owned()))?;

    let stop_reason = match choice.finish_reason.as_deref() {
        Some("stop") | None => StopReason::EndTurn,
        Some("length") => StopReason::MaxTokens,
        Some("content_filter") => StopReason::ContentFilter,
        Some(other) => StopReason::Other(other.to_owned()),
    };

    let usage = UsageStats {
        input_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.prompt_tokens)
            .unwrap_or(0),
        output_tokens: resp
            .usage
            .as_ref()
            .and_then(|u| u.completion_tokens)
            .unwrap_or(0),
    };

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        stop_reason,
        usage,
        model: resp.model,
    })
}

/// Meaning of one Server-Sent Events line in a streamed completion.
#[doc(hidden)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// A text fragment to forward.
    Fragment(String),
    /// The `[DONE]` sentinel.
    Done,
    /// Comments, keep-alives, role-only deltas, and other fields.
    Ignore,
}

/// Interpret one SSE line of a streamed chat completion.
///
/// # Errors
///
/// Returns `ProviderError::Parse` if a `data:` payload is not valid JSON.
#[doc(hidden)]
pub fn parse_stream_line(line: &str) -> Result<StreamLine, ProviderError> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(StreamLine::Ignore);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(StreamLine::Done);
    }

    let chunk: OpenAiStreamChunk =
        serde_json::from_str(data).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let fragment = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty());

    Ok(match fragment {
        Some(text) => StreamLine::Fragment(text),
        None => StreamLine::Ignore,
    })
}

/// Splits a raw byte stream into complete lines.
///
/// Bytes are buffered until a newline arrives so multi-byte UTF-8 sequences
/// split across network chunks decode correctly.
#[doc(hidden)]
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and return every line completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(
                String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\r', '\n'])
                    .to_owned(),
            );
        }
        lines
    }

    /// Return the trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&raw).trim_end_matches('\r').to_owned())
    }
}

fn role_to_openai(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
    }
}

/// Forward fragments from an SSE response body into `tx`.
///
/// Returns when the body ends, `[DONE]` arrives, or the receiver goes away.
async fn pump_sse(response: reqwest::Response, tx: mpsc::Sender<Result<String, ProviderError>>) {
    let mut body = Box::pin(response.bytes_stream());
    let mut lines = LineBuffer::default();

    while let Some(next) = body.next().await {
        let bytes = match next {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tx.send(Err(ProviderError::Request(e))).await;
                return;
            }
        };
        for line in lines.push(&bytes) {
            if !forward_line(&line, &tx).await {
                return;
            }
        }
    }

    if let Some(line) = lines.finish() {
        forward_line(&line, &tx).await;
    }
}

/// Forward one line; returns `false` when streaming should stop.
async fn forward_line(line: &str, tx: &mpsc::Sender<Result<String, ProviderError>>) -> bool {
    match parse_stream_line(line) {
        Ok(StreamLine::Fragment(text)) => tx.send(Ok(text)).await.is_ok(),
        Ok(StreamLine::Done) => false,
        Ok(StreamLine::Ignore) => true,
        Err(e) => {
            warn!(error = %e, "malformed stream chunk");
            let _ = tx.send(Err(e)).await;
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Trait impl
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let api_request = build_request(&self.model_name, &request, false);
        let response = self.send(&api_request).await?;
        let payload = check_http_response(response).await?;
        let parsed = parse_response(&payload)?;
        debug!(
            model = %parsed.model,
            input_tokens = parsed.usage.input_tokens,
            output_tokens = parsed.usage.output_tokens,
            "completion received"
        );
        Ok(parsed)
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let api_request = build_request(&self.model_name, &request, true);
        let response = self.send(&api_request).await?;

        let status = response.status();
        if !status.is_success() {
            // Reuse the body sanitizer on the error path.
            return Err(check_http_response(response)
                .await
                .err()
                .unwrap_or(ProviderError::HttpStatus {
                    status: status.as_u16(),
                    body: String::new(),
                }));
        }

        let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
        tokio::spawn(pump_sse(response, tx));
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn model_id(&self) -> &str {
        &self.model_name
    }
}
