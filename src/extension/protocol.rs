//! Typed messages exchanged between the extension contexts.

use super::auth::AuthState;
use super::extractor::{CodeAndExamples, ProblemSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// A request addressed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    CheckAuth,
    GetProblemData {
        #[serde(rename = "requestId")]
        request_id: u64,
    },
    GetCodeAndExamples,
}

impl Request {
    pub fn action(&self) -> &'static str {
        match self {
            Self::CheckAuth => "checkAuth",
            Self::GetProblemData { .. } => "getProblemData",
            Self::GetCodeAndExamples => "getCodeAndExamples",
        }
    }

    /// Requests answered by the page context rather than the relay itself.
    pub fn is_page_bound(&self) -> bool {
        matches!(
            self,
            Self::GetProblemData { .. } | Self::GetCodeAndExamples
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Payload {
    Auth(AuthState),
    Problem(ProblemSnapshot),
    Code(CodeAndExamples),
}

/// Reply to exactly one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(data: Payload) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Successful payload, or the error text. A success without data is malformed.
    pub fn into_result(self) -> Result<Payload, String> {
        match (self.success, self.data, self.error) {
            (true, Some(data), _) => Ok(data),
            (true, None, _) => Err("malformed response: success without data".into()),
            (false, _, error) => Err(error.unwrap_or_else(|| "unknown error".into())),
        }
    }
}

/// Who sent a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Panel { panel_id: u64 },
    Page { tab_id: u64 },
    External(String),
}

impl Origin {
    pub fn label(&self) -> String {
        match self {
            Self::Panel { panel_id } => format!("panel:{panel_id}"),
            Self::Page { tab_id } => format!("page:{tab_id}"),
            Self::External(id) => format!("external:{id}"),
        }
    }

    /// Page data is only handed to the panel; auth may be asked by either context.
    pub fn permits(&self, request: &Request) -> bool {
        match self {
            Self::Panel { .. } => true,
            Self::Page { .. } => matches!(request, Request::CheckAuth),
            Self::External(_) => false,
        }
    }
}

/// A request in flight together with its single-use reply handle.
#[derive(Debug)]
pub struct Envelope {
    pub origin: Origin,
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}
