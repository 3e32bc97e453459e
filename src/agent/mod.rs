//! The advisor: per-query dialogue orchestration.
//!
//! [`Advisor::assist`] resolves the session's profile, then takes exactly one
//! of three paths:
//!
//! - first contact: the greeting, with no model or search call
//! - onboarding: store the answer, ask the next question (or, after the last
//!   one, generate a growth hypothesis and summarise it)
//! - advice: classify the query, optionally search, generate, and stream
//!
//! Whatever happens, the `FINAL_RESPONSE` stream is closed and the request
//! is completed exactly once.

use std::sync::Arc;

use chrono::Utc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, info_span, warn, Instrument};

pub mod hypothesis;
pub mod onboarding;
pub mod prompts;

use crate::config::{Config, ConfigError};
use crate::credentials::Credentials;
use crate::messaging::response::{
    FINAL_RESPONSE, SEARCH_ERROR, SEARCH_NOTIFICATION, SEARCH_RESULTS,
};
use crate::messaging::{
    segment, ReplacementFilter, ResponseError, ResponseHandler, Segmenter, TextStream,
    TransformChain,
};
use crate::profile::{
    InMemoryProfileStore, OnboardingError, ProfileLease, ProfileRecord, ProfileStore, Transition,
};
use crate::providers::openai::OpenAiCompatProvider;
use crate::providers::{CompletionRequest, LlmProvider, ProviderError};
use crate::search::classifier::{ClassifierRules, SearchClassifier};
use crate::search::tavily::TavilyClient;
use crate::search::{SearchProvider, SearchResult, MAX_FORWARDED_RESULTS};

/// Shown while a search runs.
pub const SEARCH_NOTIFICATION_TEXT: &str =
    "Researching the latest market data to provide you with up-to-date information...";
/// Shown when search fails or finds nothing.
pub const SEARCH_FALLBACK_TEXT: &str =
    "I couldn't complete the market search right now, so here's my advice based on what I already know.";
/// Shown when the answer could not be generated.
pub const GENERATION_FAILED_TEXT: &str =
    "Sorry, I couldn't put together an answer right now. Please try again in a moment.";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One inbound query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Opaque session identifier.
    pub session_id: String,
    /// Query text.
    pub text: String,
}

impl Query {
    /// Build a query.
    pub fn new(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            text: text.into(),
        }
    }
}

/// External collaborators of the advisor.
pub struct AdvisorDeps {
    /// Text generation.
    pub llm: Arc<dyn LlmProvider>,
    /// Web search.
    pub search: Arc<dyn SearchProvider>,
    /// Profile storage.
    pub store: Arc<dyn ProfileStore>,
}

/// Request-fatal failures inside one `assist` call.
#[derive(Debug, thiserror::Error)]
pub enum AdvisorError {
    /// The answer-producing model call failed.
    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),
    /// The caller stopped listening.
    #[error(transparent)]
    Response(#[from] ResponseError),
    /// Onboarding state was inconsistent.
    #[error(transparent)]
    Onboarding(#[from] OnboardingError),
}

/// Model call parameters shared by every prompt.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: Option<u32>,
    /// Use the streamed form for answers.
    pub streaming: bool,
    /// Total attempts for the answer-producing call.
    pub max_attempts: u32,
}

impl GenerationSettings {
    /// Request carrying the persona system prompt and the tone reminder.
    pub fn request(&self, prompt: &str) -> CompletionRequest {
        let mut request = CompletionRequest::prompt(
            Some(prompts::system_prompt(Utc::now().date_naive())),
            prompts::with_tone_reminder(prompt),
        );
        request.temperature = Some(self.temperature);
        request.max_tokens = self.max_tokens;
        request
    }
}

/// A failed generation attempt and whether any chunk already went out.
struct AttemptFailure {
    error: AdvisorError,
    emitted: bool,
}

impl AttemptFailure {
    fn retryable(&self) -> bool {
        !self.emitted && matches!(&self.error, AdvisorError::Generation(e) if e.is_transient())
    }
}

// ---------------------------------------------------------------------------
// Advisor
// ---------------------------------------------------------------------------

/// The SaaS growth advisor.
pub struct Advisor {
    deps: AdvisorDeps,
    classifier: SearchClassifier,
    transforms: TransformChain,
    generation: GenerationSettings,
    top_k: usize,
    min_words: usize,
    max_sentences: Option<u32>,
    min_answer_chars: usize,
}

impl Advisor {
    /// Build an advisor around the given collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if classifier rules or the
    /// replacement table do not compile.
    pub fn new(deps: AdvisorDeps, config: &Config) -> Result<Self, ConfigError> {
        let classifier = SearchClassifier::new(&ClassifierRules::from_config(&config.classifier))
            .map_err(|e| ConfigError::Invalid {
                field: "classifier",
                reason: e.to_string(),
            })?;
        let filter =
            ReplacementFilter::new(&config.response.replacements).map_err(|e| {
                ConfigError::Invalid {
                    field: "response.replacements",
                    reason: e.to_string(),
                }
            })?;

        Ok(Self {
            deps,
            classifier,
            transforms: TransformChain::new().with(filter),
            generation: GenerationSettings {
                temperature: config.generation.temperature,
                max_tokens: config.generation.max_tokens,
                streaming: config.generation.streaming,
                max_attempts: config.generation.max_attempts.max(1),
            },
            top_k: config.search.top_k.min(MAX_FORWARDED_RESULTS),
            min_words: config.response.min_words,
            max_sentences: config.response.max_sentences,
            min_answer_chars: config.onboarding.min_answer_chars,
        })
    }

    /// Build the production advisor: Fireworks-compatible generation, Tavily
    /// search, and an in-memory profile store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if either API key is absent,
    /// or [`ConfigError::Invalid`] for unusable settings.
    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self, ConfigError> {
        let model_key = credentials.require(&config.generation.api_key_env)?;
        let search_key = credentials.require(&config.search.api_key_env)?;

        let llm: Arc<dyn LlmProvider> = Arc::new(OpenAiCompatProvider::new(
            config.generation.base_url.clone(),
            config.generation.model.clone(),
            model_key,
        ));
        let search: Arc<dyn SearchProvider> = Arc::new(
            TavilyClient::new(&config.search, search_key).map_err(|e| ConfigError::Invalid {
                field: "search",
                reason: e.to_string(),
            })?,
        );
        let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::from_config(
            &config.store,
            config.onboarding.flow,
        ));

        info!(model = %llm.model_id(), "advisor ready");
        Self::new(AdvisorDeps { llm, search, store }, config)
    }

    /// The profile store backing this advisor.
    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.deps.store
    }

    /// Answer one query, writing every event to `response`.
    ///
    /// Never fails: errors are reported on the channel as an `error` event,
    /// and the stream close plus `done` are always sent.
    pub async fn assist(&self, query: Query, response: ResponseHandler) {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!("assist", session_id = %query.session_id, %request_id);

        async move {
            let stream = response.create_text_stream(FINAL_RESPONSE);

            match self.dispatch(&query, &response, &stream).await {
                Ok(()) => {}
                Err(AdvisorError::Response(e)) => debug!(error = %e, "caller went away"),
                Err(e) => {
                    error!(error = %e, "request failed");
                    if let Err(e) = response.emit_error(GENERATION_FAILED_TEXT).await {
                        debug!(error = %e, "could not deliver error notice");
                    }
                }
            }

            if let Err(e) = stream.complete().await {
                debug!(error = %e, "could not close response stream");
            }
            if let Err(e) = response.complete().await {
                debug!(error = %e, "could not signal completion");
            }
        }
        .instrument(span)
        .await;
    }

    async fn dispatch(
        &self,
        query: &Query,
        response: &ResponseHandler,
        stream: &TextStream,
    ) -> Result<(), AdvisorError> {
        let mut profile = self.deps.store.acquire(&query.session_id).await;

        if profile.is_new() {
            info!("first contact, sending greeting");
            return self.emit_canned(stream, onboarding::GREETING).await;
        }

        if !profile.is_complete() {
            return self.onboard(&mut profile, &query.text, stream).await;
        }

        // Advice does not touch the profile; let other requests proceed.
        let snapshot = ProfileRecord::clone(&profile);
        drop(profile);
        self.advise(&snapshot, &query.text, response, stream).await
    }

    async fn onboard(
        &self,
        profile: &mut ProfileLease,
        answer: &str,
        stream: &TextStream,
    ) -> Result<(), AdvisorError> {
        let answered = profile.stage();
        let transition = profile.record_answer(answer, self.min_answer_chars)?;
        self.deps.store.commit(profile).await;

        let message = match transition {
            Transition::Next(next) => {
                info!(answered = %answered, next = %next, "onboarding advanced");
                onboarding::question_for(next).to_owned()
            }
            Transition::Completed => {
                info!(answered = %answered, "onboarding complete");
                let hypothesis =
                    hypothesis::generate(self.deps.llm.as_ref(), profile, &self.generation).await;
                onboarding::completion_message(profile, &hypothesis)
            }
        };
        self.emit_canned(stream, &message).await
    }

    async fn advise(
        &self,
        profile: &ProfileRecord,
        query: &str,
        response: &ResponseHandler,
        stream: &TextStream,
    ) -> Result<(), AdvisorError> {
        let trigger = self.classifier.classify(query);
        info!(
            search = trigger.is_some(),
            tier = trigger.map(|t| t.label()).unwrap_or("none"),
            "query classified"
        );

        if trigger.is_some() {
            if let Some(results) = self.search(profile, query, response).await? {
                let prompt = prompts::search_augmented_prompt(profile, query, &results);
                return self.generate_into(&prompt, stream).await;
            }
            response
                .emit_text_block(SEARCH_ERROR, SEARCH_FALLBACK_TEXT)
                .await?;
        }

        let prompt = prompts::standard_advice_prompt(profile, query, self.max_sentences);
        self.generate_into(&prompt, stream).await
    }

    /// Run the search and forward the top results. `None` means fall back.
    async fn search(
        &self,
        profile: &ProfileRecord,
        query: &str,
        response: &ResponseHandler,
    ) -> Result<Option<Vec<SearchResult>>, AdvisorError> {
        response
            .emit_text_block(SEARCH_NOTIFICATION, SEARCH_NOTIFICATION_TEXT)
            .await?;

        let search_query = prompts::search_query(query, profile);
        info!(query = %search_query, "searching");
        match self.deps.search.search(&search_query).await {
            Ok(results) if !results.is_empty() => {
                let top: Vec<SearchResult> = results.into_iter().take(self.top_k).collect();
                info!(results = top.len(), "search results forwarded");
                response
                    .emit_json(SEARCH_RESULTS, serde_json::json!({ "results": top }))
                    .await?;
                Ok(Some(top))
            }
            Ok(_) => {
                warn!("search returned no results, falling back to standard advice");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "search failed, falling back to standard advice");
                Ok(None)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Output
    // -----------------------------------------------------------------------

    async fn emit_canned(&self, stream: &TextStream, text: &str) -> Result<(), AdvisorError> {
        for chunk in segment(text, self.min_words) {
            stream.emit_chunk(chunk).await?;
        }
        Ok(())
    }

    async fn emit_generated(&self, stream: &TextStream, chunk: &str) -> Result<(), ResponseError> {
        stream.emit_chunk(&self.transforms.apply(chunk)).await
    }

    /// Generate an answer for `prompt` and stream it, retrying transient
    /// failures that happen before the first chunk.
    async fn generate_into(&self, prompt: &str, stream: &TextStream) -> Result<(), AdvisorError> {
        let request = self.generation.request(prompt);
        let mut attempt: u32 = 1;
        loop {
            match self.attempt_generation(request.clone(), stream).await {
                Ok(()) => return Ok(()),
                Err(failure) if failure.retryable() && attempt < self.generation.max_attempts => {
                    warn!(attempt, error = %failure.error, "generation failed, retrying");
                    attempt = attempt.saturating_add(1);
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn attempt_generation(
        &self,
        request: CompletionRequest,
        stream: &TextStream,
    ) -> Result<(), AttemptFailure> {
        let mut segmenter = Segmenter::new(self.min_words);
        let mut emitted = false;
        let fail = |error: AdvisorError, emitted: bool| AttemptFailure { error, emitted };

        if self.generation.streaming {
            let mut fragments = self
                .deps
                .llm
                .stream(request)
                .await
                .map_err(|e| fail(e.into(), false))?;
            while let Some(fragment) = fragments.next().await {
                let fragment = fragment.map_err(|e| fail(e.into(), emitted))?;
                for chunk in segmenter.push(&fragment) {
                    self.emit_generated(stream, &chunk)
                        .await
                        .map_err(|e| fail(e.into(), true))?;
                    emitted = true;
                }
            }
        } else {
            let completion = self
                .deps
                .llm
                .complete(request)
                .await
                .map_err(|e| fail(e.into(), false))?;
            for chunk in segmenter.push(&completion.text) {
                self.emit_generated(stream, &chunk)
                    .await
                    .map_err(|e| fail(e.into(), true))?;
                emitted = true;
            }
        }

        if let Some(rest) = segmenter.finish() {
            self.emit_generated(stream, &rest)
                .await
                .map_err(|e| fail(e.into(), true))?;
            emitted = true;
        }
        if !emitted {
            warn!("model returned an empty answer");
        }
        Ok(())
    }
}
