use crate::api::QueryRecord;
use crate::error::PanelError;
use crate::extension::extractor::ProblemSnapshot;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Logical request types; de-duplication is per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ProblemData,
    QueryLookup,
    QuerySubmit,
    HistoryList,
    QueryDelete,
}

/// What the panel renders.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    Problem(ProblemSnapshot),
    Explanation(QueryRecord),
    History(Vec<QueryRecord>),
    Deleted { id: String },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PanelState {
    #[default]
    Idle,
    Requesting {
        kind: RequestKind,
        attempt: u32,
    },
    Retrying {
        kind: RequestKind,
        attempt: u32,
        delay: Duration,
    },
    Succeeded(PanelContent),
    /// Terminal for this request; the panel offers a manual retry.
    Failed {
        kind: RequestKind,
        error: PanelError,
    },
}

impl PanelState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PendingRequest {
    pub attempt: u32,
    pub started_at: Instant,
}

/// In-flight markers, at most one per [`RequestKind`].
#[derive(Debug, Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<RequestKind, PendingRequest>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `kind`. `None` when a request of that kind is already in flight.
    pub fn begin(&self, kind: RequestKind) -> Option<PendingGuard<'_>> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.contains_key(&kind) {
            return None;
        }
        inner.insert(
            kind,
            PendingRequest {
                attempt: 0,
                started_at: Instant::now(),
            },
        );
        Some(PendingGuard {
            pending: self,
            kind,
        })
    }

    pub fn get(&self, kind: RequestKind) -> Option<PendingRequest> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .copied()
    }

    pub fn is_pending(&self, kind: RequestKind) -> bool {
        self.get(kind).is_some()
    }

    /// Current attempt for `kind`; zero when nothing is in flight.
    pub fn attempt(&self, kind: RequestKind) -> u32 {
        self.get(kind).map_or(0, |p| p.attempt)
    }

    fn set_attempt(&self, kind: RequestKind, attempt: u32) {
        if let Some(entry) = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&kind)
        {
            entry.attempt = attempt;
        }
    }

    fn finish(&self, kind: RequestKind) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
    }
}

/// Clears its pending marker when dropped, including on cancellation.
pub struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    kind: RequestKind,
}

impl PendingGuard<'_> {
    pub fn set_attempt(&self, attempt: u32) {
        self.pending.set_attempt(self.kind, attempt);
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.finish(self.kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_pending_request_per_kind() {
        let pending = PendingRequests::new();
        let guard = pending.begin(RequestKind::ProblemData).unwrap();
        assert!(pending.begin(RequestKind::ProblemData).is_none());
        assert!(pending.begin(RequestKind::QueryLookup).is_some());

        guard.set_attempt(2);
        assert_eq!(pending.attempt(RequestKind::ProblemData), 2);

        drop(guard);
        assert!(!pending.is_pending(RequestKind::ProblemData));
        assert_eq!(pending.attempt(RequestKind::ProblemData), 0);
        assert!(pending.begin(RequestKind::ProblemData).is_some());
    }

    #[test]
    fn terminal_states() {
        assert!(!PanelState::Idle.is_terminal());
        assert!(
            PanelState::Failed {
                kind: RequestKind::ProblemData,
                error: PanelError::Unauthenticated,
            }
            .is_terminal()
        );
    }
}
