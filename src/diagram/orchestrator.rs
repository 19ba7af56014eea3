//! Diagram orchestration for one repository.
//!
//! Ties the cache, the commit oracle, the cost endpoint and the streaming
//! backend together. Every operation resolves to a [`DiagramOutcome`];
//! failures become a user-facing message on the outcome, never an `Err`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, info_span, warn, Instrument};

use super::freshness::{self, FreshnessDecision};
use super::gateway::CacheGateway;
use super::inflight::{InflightRegistry, Join, Lease};
use super::oracle::CommitOracle;
use super::parser::SseParser;
use super::state::GenerationState;
use crate::context::ServiceContext;
use crate::credentials::CredentialProvider;
use crate::error::{BackendError, GenerationError};
use crate::ports::backend::{CostEstimate, CostRequest, GenerationBackend, GenerationRequest};
use crate::ports::cache::{DiagramWrite, RepoKey, DEFAULT_EXPLANATION};
use crate::ports::credentials::Credentials;
use crate::ports::id_gen::IdGenerator;

/// Showcase repositories that can be viewed but not changed.
pub const EXAMPLE_REPOS: [&str; 2] = ["fastapi/fastapi", "vercel/ai-chatbot"];

const LOAD_COST_FAILURE: &str = "Something went wrong. Please try again later.";
const REGENERATE_COST_FAILURE: &str = "Failed to regenerate diagram. Please try again later.";

/// Whether `key` is one of the [`EXAMPLE_REPOS`]. Case-insensitive.
#[must_use]
pub fn is_example_repo(key: &RepoKey) -> bool {
    let full_name = key.to_string();
    EXAMPLE_REPOS.iter().any(|example| example.eq_ignore_ascii_case(&full_name))
}

/// Where an outcome's diagram came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    /// Served from the cache without contacting the backend.
    Cache,
    /// Produced (or attempted) by a generation call.
    Generation,
    /// Refused locally before any backend call.
    Rejected,
}

/// What the UI layer receives from every orchestrator operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagramOutcome {
    /// Final or partial diagram text.
    pub diagram: String,
    /// Final or partial explanation.
    pub explanation: String,
    /// User-facing failure message.
    pub error: Option<String>,
    /// When the cached diagram was last written.
    pub last_generated: Option<DateTime<Utc>>,
    /// Cost estimate reported before generating.
    pub cost: Option<String>,
    /// Where the diagram came from.
    pub source: OutcomeSource,
}

impl DiagramOutcome {
    fn rejected(err: &GenerationError) -> Self {
        Self {
            diagram: String::new(),
            explanation: String::new(),
            error: Some(err.user_message()),
            last_generated: None,
            cost: None,
            source: OutcomeSource::Rejected,
        }
    }

    /// Whether the operation produced a usable diagram.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && !self.diagram.is_empty()
    }
}

/// Tunables for one orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct GenerationOptions {
    /// Freshness tolerance between the latest commit and the cached diagram.
    pub grace: chrono::Duration,
    /// Longest wait for the next stream chunk.
    pub idle_timeout: Duration,
}

/// Drives cache lookups and generations for one `(owner, repo)`.
pub struct DiagramOrchestrator {
    key: RepoKey,
    gateway: CacheGateway,
    oracle: CommitOracle,
    backend: Arc<dyn GenerationBackend>,
    credentials: Arc<CredentialProvider>,
    id_gen: Arc<dyn IdGenerator>,
    inflight: Arc<InflightRegistry<DiagramOutcome>>,
    options: GenerationOptions,
    state: watch::Sender<GenerationState>,
}

impl DiagramOrchestrator {
    /// Creates an orchestrator for `key` over the ports in `ctx`.
    ///
    /// Orchestrators sharing `inflight` coordinate concurrent calls for the
    /// same repository.
    #[must_use]
    pub fn new(
        ctx: &ServiceContext,
        key: RepoKey,
        inflight: Arc<InflightRegistry<DiagramOutcome>>,
    ) -> Self {
        let (state, _) = watch::channel(GenerationState::default());
        Self {
            key,
            gateway: CacheGateway::new(Arc::clone(&ctx.cache)),
            oracle: CommitOracle::new(Arc::clone(&ctx.source_control)),
            backend: Arc::clone(&ctx.backend),
            credentials: Arc::clone(&ctx.credentials),
            id_gen: Arc::clone(&ctx.id_gen),
            inflight,
            options: GenerationOptions {
                grace: ctx.settings.cache_grace(),
                idle_timeout: ctx.settings.stream_idle_timeout,
            },
            state,
        }
    }

    /// The repository this orchestrator serves.
    #[must_use]
    pub fn key(&self) -> &RepoKey {
        &self.key
    }

    /// Live snapshots of the current generation call.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    /// Serves the cached diagram when it is fresh, otherwise generates one.
    ///
    /// A call for a repository that already has a generation in flight
    /// waits for that generation instead of starting another.
    pub async fn load(&self) -> DiagramOutcome {
        loop {
            match self.inflight.join(&self.key) {
                Join::Leader(lease) => {
                    let outcome = self.load_as_leader(&lease).await;
                    lease.complete(&outcome);
                    return outcome;
                }
                Join::Follower(waiter) => {
                    info!(repo = %self.key, "waiting on in-flight generation");
                    if let Some(outcome) = waiter.outcome().await {
                        return outcome;
                    }
                }
            }
        }
    }

    /// Regenerates with `instructions`, without checking freshness.
    ///
    /// Requires an existing cached diagram; refused for example repositories.
    pub async fn modify(&self, instructions: &str) -> DiagramOutcome {
        let instructions = instructions.trim();
        if instructions.is_empty() {
            return DiagramOutcome::rejected(&GenerationError::Invalid(
                "Instructions cannot be empty".into(),
            ));
        }
        if is_example_repo(&self.key) {
            return DiagramOutcome::rejected(&GenerationError::Invalid(
                "Example repositories cannot be modified.".into(),
            ));
        }
        if self.gateway.get(&self.key).is_none() {
            return DiagramOutcome::rejected(&GenerationError::Invalid(
                "No existing diagram found to modify".into(),
            ));
        }

        let lease = self.inflight.preempt(&self.key);
        let credentials = self.credentials.current();
        let api_key = credentials.api_key.clone();
        let outcome = self.generate(&lease, instructions, api_key, &credentials, None).await;
        lease.complete(&outcome);
        outcome
    }

    /// Re-validates cost, then regenerates with `instructions`.
    pub async fn regenerate(&self, instructions: &str) -> DiagramOutcome {
        if is_example_repo(&self.key) {
            return DiagramOutcome::rejected(&GenerationError::Invalid(
                "Example repositories cannot be regenerated.".into(),
            ));
        }

        let lease = self.inflight.preempt(&self.key);
        let credentials = self.credentials.current();
        let outcome = match self.estimate_cost(&credentials, REGENERATE_COST_FAILURE).await {
            Ok(cost) => {
                let api_key = credentials.api_key.clone();
                self.generate(&lease, instructions.trim(), api_key, &credentials, cost).await
            }
            Err(err) => self.failed_before_stream(&err),
        };
        lease.complete(&outcome);
        outcome
    }

    /// Saves `api_key` and immediately generates with it.
    pub async fn submit_api_key(&self, api_key: &str) -> DiagramOutcome {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return DiagramOutcome::rejected(&GenerationError::Invalid(
                "API key cannot be empty".into(),
            ));
        }
        if let Err(err) = self.credentials.update(|c| c.api_key = Some(api_key.to_string())) {
            warn!(error = %err, "continuing with unsaved API key");
        }

        let lease = self.inflight.preempt(&self.key);
        let credentials = self.credentials.current();
        let outcome =
            self.generate(&lease, "", Some(api_key.to_string()), &credentials, None).await;
        lease.complete(&outcome);
        outcome
    }

    async fn load_as_leader(&self, lease: &Lease<DiagramOutcome>) -> DiagramOutcome {
        let (cached, latest_commit) = tokio::join!(
            async { self.gateway.get(&self.key) },
            self.oracle.latest_commit_date(&self.key.owner, &self.key.repo),
        );

        let decision =
            freshness::decide(cached.as_ref().map(|r| r.updated_at), latest_commit, self.options.grace);
        if let (FreshnessDecision::UseCache, Some(record)) = (decision, cached) {
            info!(repo = %self.key, updated_at = %record.updated_at, "serving cached diagram");
            return DiagramOutcome {
                last_generated: Some(record.updated_at),
                diagram: record.diagram,
                explanation: record.explanation,
                error: None,
                cost: None,
                source: OutcomeSource::Cache,
            };
        }

        let credentials = self.credentials.current();
        match self.estimate_cost(&credentials, LOAD_COST_FAILURE).await {
            Ok(cost) => {
                let api_key = credentials.api_key.clone();
                self.generate(lease, "", api_key, &credentials, cost).await
            }
            Err(err) => self.failed_before_stream(&err),
        }
    }

    async fn estimate_cost(
        &self,
        credentials: &Credentials,
        failure_message: &str,
    ) -> Result<Option<String>, GenerationError> {
        let request = CostRequest {
            username: self.key.owner.clone(),
            repo: self.key.repo.clone(),
            instructions: String::new(),
            github_pat: credentials.github_pat.clone(),
        };
        match self.backend.estimate_cost(&request).await {
            Ok(CostEstimate { error: Some(error), .. }) if !error.is_empty() => {
                warn!(repo = %self.key, %error, "cost estimation refused");
                Err(GenerationError::Cost(error))
            }
            Ok(estimate) => Ok(estimate.cost),
            Err(BackendError::RateLimited) => Err(GenerationError::RateLimited),
            Err(err) => {
                warn!(repo = %self.key, error = %err, "cost estimation failed");
                Err(GenerationError::Cost(failure_message.to_string()))
            }
        }
    }

    /// Runs one generation call, tagged with a fresh id for log correlation.
    async fn generate(
        &self,
        lease: &Lease<DiagramOutcome>,
        instructions: &str,
        api_key: Option<String>,
        credentials: &Credentials,
        cost: Option<String>,
    ) -> DiagramOutcome {
        let generation_id = self.id_gen.generate_id();
        let span = info_span!("generation", id = %generation_id, repo = %self.key);

        async {
            info!(modified = !instructions.is_empty(), "starting generation");
            let used_own_key = api_key.is_some();
            let request = GenerationRequest {
                username: self.key.owner.clone(),
                repo: self.key.repo.clone(),
                instructions: instructions.to_string(),
                api_key,
                github_pat: credentials.github_pat.clone(),
            };

            self.state.send_replace(GenerationState::started());
            let result = self
                .stream_into_state(lease, &request)
                .await
                .and_then(|()| self.finish(used_own_key));

            match result {
                Ok(last_generated) => {
                    let state = self.state.borrow().clone();
                    info!(diagram_len = state.diagram.len(), "generation complete");
                    DiagramOutcome {
                        diagram: state.diagram,
                        explanation: state.explanation,
                        error: None,
                        last_generated,
                        cost,
                        source: OutcomeSource::Generation,
                    }
                }
                Err(err) => {
                    warn!(error = %err, "generation failed");
                    let message = err.user_message();
                    // A superseded call no longer owns the published state.
                    if err != GenerationError::Superseded {
                        self.state.send_modify(|state| state.fail(&message));
                    }
                    let state = self.state.borrow().clone();
                    DiagramOutcome {
                        diagram: state.diagram,
                        explanation: state.explanation,
                        error: Some(message),
                        last_generated: None,
                        cost,
                        source: OutcomeSource::Generation,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Reads the stream until the state machine reaches a terminal phase.
    async fn stream_into_state(
        &self,
        lease: &Lease<DiagramOutcome>,
        request: &GenerationRequest,
    ) -> Result<(), GenerationError> {
        let mut body = tokio::select! {
            biased;
            () = lease.cancelled() => return Err(GenerationError::Superseded),
            body = self.backend.stream(request) => body?,
        };

        let mut parser = SseParser::new();
        loop {
            let next = tokio::select! {
                biased;
                () = lease.cancelled() => return Err(GenerationError::Superseded),
                next = tokio::time::timeout(self.options.idle_timeout, body.next()) => next,
            };

            let (frames, ended) = match next {
                Err(_) => {
                    return Err(GenerationError::IdleTimeout(self.options.idle_timeout.as_secs()))
                }
                Ok(Some(Err(err))) => return Err(err.into()),
                Ok(Some(Ok(chunk))) => (parser.feed(&chunk), false),
                Ok(None) => (parser.finish(), true),
            };

            let mut terminal = false;
            self.state.send_modify(|state| {
                for frame in frames {
                    state.apply(frame);
                }
                terminal = state.is_terminal();
            });

            if terminal {
                let state = self.state.borrow();
                return match &state.error {
                    Some(message) => Err(GenerationError::Backend(message.clone())),
                    None => Ok(()),
                };
            }
            if ended {
                if parser.dropped() > 0 {
                    warn!(dropped = parser.dropped(), "stream ended with undecodable frames");
                }
                return Err(GenerationError::Truncated);
            }
        }
    }

    /// Writes a completed generation back to the cache, exactly once.
    fn finish(&self, used_own_key: bool) -> Result<Option<DateTime<Utc>>, GenerationError> {
        let state = self.state.borrow().clone();
        if state.diagram.trim().is_empty() {
            return Err(GenerationError::EmptyDiagram);
        }
        let explanation = if state.explanation.is_empty() {
            DEFAULT_EXPLANATION.to_string()
        } else {
            state.explanation
        };
        self.gateway.put(
            &self.key,
            &DiagramWrite { diagram: state.diagram, explanation, used_own_key },
        );
        Ok(self.gateway.last_generated(&self.key))
    }

    fn failed_before_stream(&self, err: &GenerationError) -> DiagramOutcome {
        let message = err.user_message();
        self.state.send_modify(|state| {
            *state = GenerationState::started();
            state.fail(&message);
        });
        DiagramOutcome {
            diagram: String::new(),
            explanation: String::new(),
            error: Some(message),
            last_generated: None,
            cost: None,
            source: OutcomeSource::Generation,
        }
    }
}
