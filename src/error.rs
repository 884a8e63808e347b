use thiserror::Error;

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Relay errors ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The receiving context has shut down; nothing will answer.
    #[error("{context} context is not running")]
    Disconnected { context: &'static str },

    /// The request was accepted but the responder dropped its reply handle.
    #[error("{context} context dropped the reply for {action}")]
    NoReply {
        context: &'static str,
        action: &'static str,
    },
}

// ─── Backend client errors ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("not signed in")]
    Unauthenticated,

    #[error("not found")]
    NotFound,

    #[error("rejected: {0}")]
    Validation(String),

    #[error("upstream generation failed: {0}")]
    UpstreamGeneration(String),

    #[error("request failed: {0}")]
    Transport(String),
}

// ─── Generation errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Gemini API key not configured (set GEMINI_API_KEY or [generation] api_key)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(String),

    #[error("model returned no content")]
    Empty,

    #[error("prompt render failed: {0}")]
    Prompt(String),
}

// ─── Panel errors (user-visible) ─────────────────────────────────────────────

/// Failures surfaced inline in the panel.
///
/// Degraded extraction is deliberately absent: it yields defaulted fields and
/// is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("Please sign in to Lextro first")]
    Unauthenticated,

    #[error("{0}")]
    TransientFetchFailure(String),

    #[error("{0}")]
    ValidationFailure(String),

    #[error("query not found")]
    NotFound,
}

impl PanelError {
    /// Only transient failures go back through the backoff ladder.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFetchFailure(_))
    }
}

impl From<ClientError> for PanelError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Unauthenticated => Self::Unauthenticated,
            ClientError::NotFound => Self::NotFound,
            ClientError::Validation(message) => Self::ValidationFailure(message),
            ClientError::UpstreamGeneration(message) | ClientError::Transport(message) => {
                Self::TransientFetchFailure(message)
            }
        }
    }
}

impl From<RelayError> for PanelError {
    fn from(error: RelayError) -> Self {
        Self::TransientFetchFailure(error.to_string())
    }
}

// ─── Backend API errors ──────────────────────────────────────────────────────

/// Errors returned by the HTTP handlers; rendered as `{"error": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Query not found or access denied")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Failed to generate explanation")]
    UpstreamGeneration,

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_displays_correctly() {
        let err = ConfigError::Validation("bad backoff".into());
        assert_eq!(err.to_string(), "validation failed: bad backoff");
    }

    #[test]
    fn relay_no_reply_names_action() {
        let err = RelayError::NoReply {
            context: "page",
            action: "getProblemData",
        };
        assert!(err.to_string().contains("getProblemData"));
    }

    #[test]
    fn client_errors_map_onto_panel_taxonomy() {
        assert_eq!(
            PanelError::from(ClientError::Unauthenticated),
            PanelError::Unauthenticated
        );
        assert!(PanelError::from(ClientError::UpstreamGeneration("502".into())).is_retryable());
        assert!(PanelError::from(ClientError::Transport("reset".into())).is_retryable());
        assert!(!PanelError::from(ClientError::Validation("bad".into())).is_retryable());
        assert!(!PanelError::from(ClientError::NotFound).is_retryable());
    }

    #[test]
    fn unauthenticated_is_never_retried() {
        assert!(!PanelError::Unauthenticated.is_retryable());
    }
}
