//! CLI adapter: a line-oriented chat session over any async reader/writer.
//!
//! Each non-empty input line is one query for the session. Events are
//! rendered as they arrive, either human-readable or as JSON lines.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::agent::{Advisor, Query};
use crate::messaging::response::{ERROR, SEARCH_RESULTS};
use crate::messaging::{ResponseEvent, ResponseHandler};

/// Input line that ends the session.
pub const QUIT_COMMAND: &str = "/quit";

const EVENT_BUFFER: usize = 64;

/// How events are written to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Human-readable text.
    Text,
    /// One JSON object per event per line.
    Json,
}

/// Render one event, or `None` when it produces no output.
pub fn render_event(event: &ResponseEvent, mode: RenderMode) -> Option<String> {
    if mode == RenderMode::Json {
        return serde_json::to_string(event).ok().map(|line| format!("{line}\n"));
    }

    match event {
        ResponseEvent::TextChunk { content, .. } => Some(content.clone()),
        ResponseEvent::StreamComplete { .. } => Some("\n".to_owned()),
        ResponseEvent::TextBlock {
            event_name,
            content,
        } => Some(format!("[{event_name}] {content}\n")),
        ResponseEvent::Json {
            event_name,
            payload,
        } if event_name == SEARCH_RESULTS => Some(render_results(payload)),
        ResponseEvent::Json {
            event_name,
            payload,
        } => Some(format!("[{event_name}] {payload}\n")),
        ResponseEvent::Error { message } => Some(format!("[{ERROR}] {message}\n")),
        ResponseEvent::Done => None,
    }
}

fn render_results(payload: &serde_json::Value) -> String {
    let mut out = format!("[{SEARCH_RESULTS}]\n");
    let results = payload
        .get("results")
        .and_then(serde_json::Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for (i, result) in results.iter().enumerate() {
        let title = result.get("title").and_then(|v| v.as_str()).unwrap_or("");
        let url = result.get("url").and_then(|v| v.as_str()).unwrap_or("");
        out.push_str(&format!("  {}. {title} <{url}>\n", i.saturating_add(1)));
    }
    out
}

async fn drain<W>(
    mut rx: mpsc::Receiver<ResponseEvent>,
    output: &mut W,
    mode: RenderMode,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        if let Some(text) = render_event(&event, mode) {
            output.write_all(text.as_bytes()).await?;
            output.flush().await?;
        }
    }
    Ok(())
}

/// Run a chat session until end of input or [`QUIT_COMMAND`].
///
/// # Errors
///
/// Returns an I/O error if reading input or writing output fails.
pub async fn run_session<R, W>(
    advisor: &Advisor,
    session_id: &str,
    input: R,
    output: &mut W,
    mode: RenderMode,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == QUIT_COMMAND {
            break;
        }

        let (handler, rx) = ResponseHandler::channel(EVENT_BUFFER);
        let query = Query::new(session_id, text);
        let ((), written) = tokio::join!(advisor.assist(query, handler), drain(rx, output, mode));
        written?;
    }
    Ok(())
}
