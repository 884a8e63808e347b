//! JSON shapes shared by the backend handlers and the extension's client.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};

/// Cookie carrying the identity provider's session token.
pub const SESSION_COOKIE: &str = "__session";

/// Applied when a query arrives without a difficulty.
pub const DEFAULT_DIFFICULTY: &str = "medium";
/// Applied when a query arrives without a programming language.
pub const DEFAULT_LANGUAGE: &str = "javascript";

/// What kind of answer the user asked for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AnswerType {
    Code,
    LogicalExplanation,
    CompanyApproach,
}

/// Language the explanation is written in. Parsed case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
    VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ExplanationLanguage {
    English,
    Hinglish,
}

impl ExplanationLanguage {
    /// Human description used inside the prompt.
    pub fn describe(self) -> &'static str {
        match self {
            Self::English => "English",
            Self::Hinglish => "Hinglish (a mix of Hindi and English)",
        }
    }
}

/// `GET /api/user` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
}

/// `POST /api/query` body as the server receives it.
///
/// Every field is optional so the handler can apply defaults and answer with
/// field-specific validation messages instead of a generic parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestBody {
    pub problem_title: Option<String>,
    pub difficulty: Option<String>,
    pub language: Option<String>,
    pub answer_type: Option<String>,
    pub explanation_language: Option<String>,
    pub user_code: Option<String>,
    pub url: Option<String>,
    pub timestamp: Option<String>,
}

/// `POST /api/query` body as the extension sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySubmission {
    pub problem_title: String,
    pub difficulty: String,
    pub language: String,
    pub answer_type: AnswerType,
    pub explanation_language: ExplanationLanguage,
    pub user_code: String,
    pub url: String,
    pub timestamp: String,
}

/// A persisted explanation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRecord {
    pub id: String,
    pub user_id: String,
    pub problem_title: String,
    pub difficulty: String,
    pub language: String,
    pub answer_type: AnswerType,
    pub explanation_language: ExplanationLanguage,
    #[serde(default)]
    pub user_code: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub explanation: String,
    pub created_at: String,
}

/// `POST /api/query` success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEnvelope {
    pub query: QueryRecord,
}

/// `DELETE /api/query/{id}` success body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Error body used by every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
