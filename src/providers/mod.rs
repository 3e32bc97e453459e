//! Text-generation provider abstraction layer.
//!
//! Defines the [`LlmProvider`] trait and the shared request/response types
//! the advisor uses to talk to its generation backend. The only concrete
//! backend is [`openai::OpenAiCompatProvider`], which speaks the
//! OpenAI-compatible `/chat/completions` wire format (Fireworks, OpenAI,
//! vLLM, LM Studio, ...).

use std::pin::Pin;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

pub mod openai;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// Conversation participant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message.
    System,
    /// Human user message.
    User,
}

/// A plain-text message in a conversation with an LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message author.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl Message {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// A request to an LLM provider for a completion.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Conversation messages, the last one being the prompt.
    pub messages: Vec<Message>,
    /// System prompt (injected before messages).
    pub system: Option<String>,
    /// Maximum tokens in the response.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Single-prompt request with an optional system prompt.
    pub fn prompt(system: Option<String>, prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            system,
            ..Self::default()
        }
    }
}

/// The reason a completion stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Normal end of turn.
    EndTurn,
    /// Max token limit reached.
    MaxTokens,
    /// The provider filtered the content.
    ContentFilter,
    /// Provider-specific other reason.
    Other(String),
}

/// Usage statistics for a completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsageStats {
    /// Tokens used in the prompt/input.
    pub input_tokens: u32,
    /// Tokens generated in the response.
    pub output_tokens: u32,
}

/// The response from an LLM provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Generated text. May be empty, which is a valid (if unhelpful) answer.
    pub text: String,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Token usage.
    pub usage: UsageStats,
    /// The model identifier that served this response.
    pub model: String,
}

/// Incrementally produced text fragments from a streamed completion.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors returned by model providers.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP transport failure.
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Response did not match expected schema.
    #[error("provider response parse error: {0}")]
    Parse(String),
    /// Upstream provider responded with an error status.
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Sanitized response body.
        body: String,
    },
    /// The model answered a health check with no text.
    #[error("provider returned an empty reply")]
    EmptyReply,
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, rate limiting, and server-side errors are
    /// transient; malformed responses and client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(_) => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::EmptyReply => false,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

/// Check HTTP response status and return body text or a structured error.
///
/// # Errors
///
/// Returns `ProviderError::Request` on transport failure, `ProviderError::HttpStatus` on non-2xx.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, ProviderError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ProviderError::HttpStatus {
            status: status.as_u16(),
            body: sanitize_http_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace, redact token-like secrets, and truncate an error body.
pub fn sanitize_http_error_body(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut sanitized = collapsed;
    for pattern in [
        r"sk-[A-Za-z0-9]{32,}",
        r"fw_[A-Za-z0-9]{16,}",
        r"tvly-[A-Za-z0-9_\-]{16,}",
    ] {
        if let Ok(regex) = Regex::new(pattern) {
            sanitized = regex.replace_all(&sanitized, "[REDACTED]").into_owned();
        }
    }

    const MAX_ERROR_BODY_CHARS: usize = 256;
    if sanitized.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened = sanitized
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect::<String>();
        return format!("{shortened}...[truncated]");
    }

    sanitized
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Core text-generation interface.
///
/// Implementations must be `Send + Sync` so one provider can serve many
/// sessions concurrently.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Request a complete response.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on API, network, or parse failure.
    async fn complete(&self, request: CompletionRequest)
        -> Result<CompletionResponse, ProviderError>;

    /// Request a response as a stream of text fragments.
    ///
    /// The default implementation performs a blocking completion and yields
    /// its text as a single fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] if the request cannot be started. Failures
    /// after the stream has started are yielded as stream items.
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let response = self.complete(request).await?;
        Ok(Box::pin(tokio_stream::once(Ok(response.text))))
    }

    /// The model identifier string this provider is instantiated for.
    fn model_id(&self) -> &str;
}

/// Send a short health-check prompt and require a non-empty reply.
///
/// # Errors
///
/// Returns the provider error, or [`ProviderError::EmptyReply`] when the
/// model answers with blank text.
pub async fn check_model(llm: &dyn LlmProvider) -> Result<CompletionResponse, ProviderError> {
    let mut request = CompletionRequest::prompt(None, "Hello, are you working?");
    request.max_tokens = Some(16);
    let response = llm.complete(request).await?;
    if response.text.trim().is_empty() {
        return Err(ProviderError::EmptyReply);
    }
    Ok(response)
}
