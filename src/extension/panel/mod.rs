//! Panel controller: the request/retry state machine behind the side panel.
//!
//! Every panel operation goes through [`PanelController::drive`], which claims
//! the operation's [`RequestKind`], confirms the session through the relay and
//! then walks the backoff ladder on transient failures. The controller is the
//! only place in the extension that retries.

pub mod debounce;
pub mod retry;
pub mod state;


pub use debounce::Debouncer;
pub use retry::RetryPolicy;
pub use state::{PanelContent, PanelState, PendingRequest, PendingRequests, RequestKind};

use super::client::BackendClient;
use super::extractor::ProblemSnapshot;
use super::page::PageMutation;
use super::protocol::{Origin, Payload, Request};
use super::relay::RelayHandle;
use crate::api::{AnswerType, DEFAULT_LANGUAGE, ExplanationLanguage, QuerySubmission};
use crate::error::PanelError;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Choices made in the panel before asking for an explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub answer_type: AnswerType,
    pub explanation_language: ExplanationLanguage,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            answer_type: AnswerType::Code,
            explanation_language: ExplanationLanguage::English,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operation {
    ProblemData,
    Submit(SubmitOptions),
    Lookup(String),
    List,
    Delete(String),
}

impl Operation {
    fn kind(&self) -> RequestKind {
        match self {
            Self::ProblemData => RequestKind::ProblemData,
            Self::Submit(_) => RequestKind::QuerySubmit,
            Self::Lookup(_) => RequestKind::QueryLookup,
            Self::List => RequestKind::HistoryList,
            Self::Delete(_) => RequestKind::QueryDelete,
        }
    }
}

pub struct PanelController {
    origin: Origin,
    relay: RelayHandle,
    backend: Arc<BackendClient>,
    policy: RetryPolicy,
    reply_timeout: Duration,
    pending: PendingRequests,
    state: watch::Sender<PanelState>,
    snapshot: Mutex<Option<ProblemSnapshot>>,
    last_failed: Mutex<Option<Operation>>,
    next_request_id: AtomicU64,
}

impl PanelController {
    pub fn new(
        panel_id: u64,
        relay: RelayHandle,
        backend: Arc<BackendClient>,
        policy: RetryPolicy,
        reply_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(PanelState::Idle);
        Self {
            origin: Origin::Panel { panel_id },
            relay,
            backend,
            policy,
            reply_timeout,
            pending: PendingRequests::new(),
            state,
            snapshot: Mutex::new(None),
            last_failed: Mutex::new(None),
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn state(&self) -> PanelState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.state.subscribe()
    }

    pub fn pending(&self) -> &PendingRequests {
        &self.pending
    }

    /// Snapshot from the last successful problem-data request.
    pub fn snapshot(&self) -> Option<ProblemSnapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn request_problem_data(&self) -> PanelState {
        self.drive(Operation::ProblemData).await
    }

    /// Ask the backend to explain the problem currently loaded in the panel.
    pub async fn submit_query(&self, options: SubmitOptions) -> PanelState {
        self.drive(Operation::Submit(options)).await
    }

    pub async fn load_query(&self, id: impl Into<String>) -> PanelState {
        self.drive(Operation::Lookup(id.into())).await
    }

    pub async fn list_queries(&self) -> PanelState {
        self.drive(Operation::List).await
    }

    pub async fn delete_query(&self, id: impl Into<String>) -> PanelState {
        self.drive(Operation::Delete(id.into())).await
    }

    /// Manual retry after a terminal failure; starts again from attempt 0.
    pub async fn retry(&self) -> PanelState {
        let operation = self
            .last_failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match operation {
            Some(operation) => self.drive(operation).await,
            None => self.state(),
        }
    }

    /// Re-request problem data once per settled burst of page mutations.
    pub async fn run_auto_refresh(
        self: Arc<Self>,
        mut mutations: broadcast::Receiver<PageMutation>,
        debouncer: Debouncer,
    ) {
        while let Some(mutation) = debouncer.next_burst(&mut mutations).await {
            tracing::debug!(url = %mutation.url, sequence = mutation.sequence, "page settled; refreshing");
            let controller = Arc::clone(&self);
            tokio::spawn(async move {
                controller.request_problem_data().await;
            });
        }
        tracing::debug!("mutation feed closed; auto-refresh stopped");
    }

    async fn drive(&self, operation: Operation) -> PanelState {
        let kind = operation.kind();
        let Some(guard) = self.pending.begin(kind) else {
            tracing::debug!(?kind, "request already in flight; ignored");
            return self.state();
        };

        let mut attempt = 0;
        loop {
            guard.set_attempt(attempt);
            self.publish(PanelState::Requesting { kind, attempt });

            let error = match self.attempt(&operation).await {
                Ok(content) => {
                    if attempt > 0 {
                        tracing::info!(?kind, attempt, "request recovered after retries");
                    }
                    self.clear_failed(kind);
                    return self.publish(PanelState::Succeeded(content));
                }
                Err(error) => error,
            };

            if error.is_retryable() && self.policy.should_retry(attempt) {
                let delay = self.policy.delay_for(attempt);
                tracing::warn!(
                    ?kind,
                    attempt = attempt + 1,
                    max_retries = self.policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    %error,
                    "panel request failed, retrying"
                );
                attempt += 1;
                self.publish(PanelState::Retrying {
                    kind,
                    attempt,
                    delay,
                });
                tokio::time::sleep(delay).await;
                continue;
            }

            tracing::warn!(?kind, attempt, %error, "panel request failed");
            *self
                .last_failed
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(operation);
            return self.publish(PanelState::Failed { kind, error });
        }
    }

    async fn attempt(&self, operation: &Operation) -> Result<PanelContent, PanelError> {
        self.ensure_authenticated().await?;

        match operation {
            Operation::ProblemData => {
                let snapshot = self.fetch_problem_data().await?;
                *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(snapshot.clone());
                Ok(PanelContent::Problem(snapshot))
            }
            Operation::Submit(options) => {
                let submission = self.build_submission(*options)?;
                let record = self.backend.submit_query(&submission).await?;
                Ok(PanelContent::Explanation(record))
            }
            Operation::Lookup(id) => Ok(PanelContent::Explanation(
                self.backend.get_query(id).await?,
            )),
            Operation::List => Ok(PanelContent::History(self.backend.list_queries().await?)),
            Operation::Delete(id) => {
                self.backend.delete_query(id).await?;
                Ok(PanelContent::Deleted { id: id.clone() })
            }
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), PanelError> {
        match self.ask_relay(Request::CheckAuth).await? {
            Payload::Auth(state) if state.authenticated => Ok(()),
            Payload::Auth(_) => Err(PanelError::Unauthenticated),
            other => Err(malformed("checkAuth", &other)),
        }
    }

    async fn fetch_problem_data(&self) -> Result<ProblemSnapshot, PanelError> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        match self.ask_relay(Request::GetProblemData { request_id }).await? {
            Payload::Problem(snapshot) => Ok(snapshot),
            other => Err(malformed("getProblemData", &other)),
        }
    }

    /// One relay round trip bounded by the per-attempt reply timeout.
    async fn ask_relay(&self, request: Request) -> Result<Payload, PanelError> {
        let action = request.action();
        let response =
            tokio::time::timeout(self.reply_timeout, self.relay.send(self.origin.clone(), request))
                .await
                .map_err(|_| {
                    PanelError::TransientFetchFailure(format!(
                        "no reply to {action} within {} ms",
                        self.reply_timeout.as_millis()
                    ))
                })??;
        response
            .into_result()
            .map_err(PanelError::TransientFetchFailure)
    }

    fn build_submission(&self, options: SubmitOptions) -> Result<QuerySubmission, PanelError> {
        let snapshot = self.snapshot().ok_or_else(|| {
            PanelError::ValidationFailure("No problem loaded; open a problem page first".into())
        })?;
        let language = if snapshot.language.is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            snapshot.language.to_lowercase()
        };
        Ok(QuerySubmission {
            problem_title: snapshot.title,
            difficulty: snapshot.difficulty,
            language,
            answer_type: options.answer_type,
            explanation_language: options.explanation_language,
            user_code: snapshot.code,
            url: snapshot.source_url,
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn clear_failed(&self, kind: RequestKind) {
        let mut last_failed = self
            .last_failed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if last_failed.as_ref().is_some_and(|op| op.kind() == kind) {
            *last_failed = None;
        }
    }

    fn publish(&self, state: PanelState) -> PanelState {
        self.state.send_replace(state.clone());
        state
    }
}

fn malformed(action: &str, payload: &Payload) -> PanelError {
    PanelError::TransientFetchFailure(format!(
        "malformed {action} response: unexpected {payload:?}"
    ))
}
