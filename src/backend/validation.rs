use crate::api::{
    AnswerType, DEFAULT_DIFFICULTY, DEFAULT_LANGUAGE, ExplanationLanguage, QueryRequestBody,
};
use crate::error::ApiError;
use std::str::FromStr;
use strum::VariantNames;

/// A `POST /api/query` body with defaults applied and enums parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub problem_title: String,
    pub difficulty: String,
    pub language: String,
    pub answer_type: AnswerType,
    pub explanation_language: ExplanationLanguage,
    pub user_code: Option<String>,
    pub url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn validate_query(body: QueryRequestBody) -> Result<ValidatedQuery, ApiError> {
    let problem_title = non_empty(body.problem_title)
        .ok_or_else(|| ApiError::Validation("Missing required field: problemTitle".into()))?;

    let answer_type = match non_empty(body.answer_type) {
        None => AnswerType::Code,
        Some(raw) => AnswerType::from_str(&raw).map_err(|_| {
            ApiError::Validation(format!(
                "Invalid answerType. Must be one of: {}",
                AnswerType::VARIANTS.join(", ")
            ))
        })?,
    };

    let explanation_language = match non_empty(body.explanation_language) {
        None => ExplanationLanguage::English,
        Some(raw) => ExplanationLanguage::from_str(raw.trim()).map_err(|_| {
            ApiError::Validation(format!(
                "Invalid language. Must be one of: {}",
                ExplanationLanguage::VARIANTS.join(", ")
            ))
        })?,
    };

    Ok(ValidatedQuery {
        problem_title: problem_title.trim().to_string(),
        difficulty: non_empty(body.difficulty).unwrap_or_else(|| DEFAULT_DIFFICULTY.into()),
        language: non_empty(body.language).unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
        answer_type,
        explanation_language,
        user_code: non_empty(body.user_code),
        url: non_empty(body.url),
    })
}
