//! Scripted collaborators for driving the advisor in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use growth_advisor::agent::{Advisor, AdvisorDeps, Query};
use growth_advisor::config::Config;
use growth_advisor::messaging::response::FINAL_RESPONSE;
use growth_advisor::messaging::{ResponseEvent, ResponseHandler};
use growth_advisor::profile::{InMemoryProfileStore, OnboardingFlow, ProfileStore};
use growth_advisor::providers::{
    CompletionRequest, CompletionResponse, FragmentStream, LlmProvider, ProviderError, StopReason,
    UsageStats,
};
use growth_advisor::search::{SearchError, SearchProvider, SearchResult};

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// One scripted model reply.
pub enum Reply {
    /// Successful text, streamed in small fragments.
    Text(String),
    /// Failure before any output.
    Fail(ProviderError),
    /// Some fragments, then a failure.
    FailMidStream(Vec<String>, ProviderError),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_owned())
}

pub fn server_error() -> ProviderError {
    ProviderError::HttpStatus {
        status: 503,
        body: "overloaded".to_owned(),
    }
}

pub fn client_error() -> ProviderError {
    ProviderError::HttpStatus {
        status: 401,
        body: "bad key".to_owned(),
    }
}

#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    /// User prompt of the `i`th request.
    pub fn prompt(&self, i: usize) -> String {
        let requests = self.requests.lock().expect("requests lock");
        let request = requests.get(i).expect("request recorded");
        request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }

    pub fn system(&self, i: usize) -> Option<String> {
        let requests = self.requests.lock().expect("requests lock");
        requests.get(i).and_then(|r| r.system.clone())
    }

    fn next(&self, request: CompletionRequest) -> Reply {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(ProviderError::Parse("script exhausted".to_owned())))
    }
}

fn fragments(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(4).map(|c| c.iter().collect()).collect()
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        match self.next(request) {
            Reply::Text(text) => Ok(CompletionResponse {
                text,
                stop_reason: StopReason::EndTurn,
                usage: UsageStats::default(),
                model: "scripted".to_owned(),
            }),
            Reply::Fail(e) | Reply::FailMidStream(_, e) => Err(e),
        }
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream, ProviderError> {
        let items: Vec<Result<String, ProviderError>> = match self.next(request) {
            Reply::Text(text) => fragments(&text).into_iter().map(Ok).collect(),
            Reply::Fail(e) => return Err(e),
            Reply::FailMidStream(parts, e) => parts
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(e)))
                .collect(),
        };
        Ok(Box::pin(tokio_stream::iter(items)))
    }

    fn model_id(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedSearch {
    replies: Mutex<VecDeque<Result<Vec<SearchResult>, SearchError>>>,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn new(replies: Vec<Result<Vec<SearchResult>, SearchError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            queries: Mutex::new(Vec::new()),
        })
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("queries lock").clone()
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        self.queries
            .lock()
            .expect("queries lock")
            .push(query.to_owned());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub fn result(n: usize) -> SearchResult {
    SearchResult {
        title: format!("Result {n}"),
        url: format!("https://techcrunch.com/{n}"),
        snippet: format!("Snippet {n}"),
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub advisor: Advisor,
    pub llm: Arc<ScriptedLlm>,
    pub search: Arc<ScriptedSearch>,
    pub store: Arc<InMemoryProfileStore>,
}

pub fn config(flow: OnboardingFlow) -> Config {
    let mut config = Config::default();
    config.onboarding.flow = flow;
    config
}

pub fn harness_with(
    config: &Config,
    store: Arc<InMemoryProfileStore>,
    llm: Vec<Reply>,
    search: Vec<Result<Vec<SearchResult>, SearchError>>,
) -> Harness {
    let llm = ScriptedLlm::new(llm);
    let search = ScriptedSearch::new(search);
    let deps = AdvisorDeps {
        llm: Arc::clone(&llm) as Arc<dyn LlmProvider>,
        search: Arc::clone(&search) as Arc<dyn SearchProvider>,
        store: Arc::clone(&store) as Arc<dyn ProfileStore>,
    };
    let advisor = match Advisor::new(deps, config) {
        Ok(advisor) => advisor,
        Err(err) => panic!("advisor should build: {err}"),
    };
    Harness {
        advisor,
        llm,
        search,
        store,
    }
}

/// Store holding `session` with a completed short-flow profile.
pub async fn onboarded_store(session: &str) -> Arc<InMemoryProfileStore> {
    let store = Arc::new(InMemoryProfileStore::new(OnboardingFlow::Short));
    let mut lease = store.acquire(session).await;
    lease
        .record_answer("An AI scheduling tool for freelancers", 3)
        .expect("idea recorded");
    drop(lease);
    store
}

/// Run one query and collect every event it produced.
pub async fn ask(advisor: &Advisor, session: &str, text: &str) -> Vec<ResponseEvent> {
    let (handler, mut rx) = ResponseHandler::channel(16);
    let collect = async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    };
    let ((), events) = tokio::join!(advisor.assist(Query::new(session, text), handler), collect);
    events
}

/// Concatenated `FINAL_RESPONSE` chunks.
pub fn final_text(events: &[ResponseEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            ResponseEvent::TextChunk {
                event_name,
                content,
                ..
            } if event_name == FINAL_RESPONSE => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

/// Index of the first text block labelled `label`.
pub fn block_index(events: &[ResponseEvent], label: &str) -> Option<usize> {
    events.iter().position(|e| {
        matches!(e, ResponseEvent::TextBlock { event_name, .. } if event_name == label)
    })
}

/// Every request ends with exactly one stream close followed by one `done`.
pub fn assert_closed_once(events: &[ResponseEvent]) {
    let closes = events
        .iter()
        .filter(|e| matches!(e, ResponseEvent::StreamComplete { .. }))
        .count();
    let dones = events
        .iter()
        .filter(|e| matches!(e, ResponseEvent::Done))
        .count();
    assert_eq!(closes, 1, "stream closed once: {events:?}");
    assert_eq!(dones, 1, "completed once: {events:?}");
    assert_eq!(events.last(), Some(&ResponseEvent::Done));
    let len = events.len();
    assert!(matches!(
        events.get(len.saturating_sub(2)),
        Some(ResponseEvent::StreamComplete { .. })
    ));
}
