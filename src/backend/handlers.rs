use super::AppState;
use super::session::extract_token;
use super::store::{NewQuery, UserRecord};
use super::validation::validate_query;
use crate::api::{DeleteResponse, ErrorBody, QueryEnvelope, QueryRecord, QueryRequestBody, UserInfo};
use crate::error::ApiError;
use axum::{
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::UpstreamGeneration => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(error) = &self {
            tracing::error!(error = %format!("{error:#}"), "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// `GET /api/query` body: one query when `?id=` is given, else the full list.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum QueryListing {
    One(QueryRecord),
    Many(Vec<QueryRecord>),
}

#[derive(Debug, Deserialize)]
pub(super) struct QueryLookup {
    id: Option<String>,
}

/// Resolve the caller's session and sync their user row.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserRecord, ApiError> {
    let token = extract_token(headers).ok_or(ApiError::Unauthorized)?;
    let identity = state
        .sessions
        .resolve(&token)
        .await
        .ok_or(ApiError::Unauthorized)?;
    Ok(state.store.upsert_user(&identity).await?)
}

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/user
pub(super) async fn handle_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserInfo>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(UserInfo {
        id: Some(user.id),
        name: user.name,
        email: user.email,
    }))
}

/// POST /api/query
pub(super) async fn handle_create_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<QueryRequestBody>, JsonRejection>,
) -> Result<Json<QueryEnvelope>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let Json(body) = body.map_err(|e| ApiError::Validation(format!("Invalid JSON: {e}")))?;
    let query = validate_query(body)?;

    let explanation = state.generator.generate(&query).await.map_err(|error| {
        tracing::warn!(
            user_id = %user.id,
            problem = %query.problem_title,
            error = %error,
            "generation failed"
        );
        ApiError::UpstreamGeneration
    })?;

    let record = state
        .store
        .insert_query(
            &user.id,
            NewQuery {
                problem_title: query.problem_title,
                difficulty: query.difficulty,
                language: query.language,
                answer_type: query.answer_type,
                explanation_language: query.explanation_language,
                user_code: query.user_code,
                url: query.url,
                explanation,
            },
        )
        .await?;
    tracing::info!(user_id = %user.id, query_id = %record.id, "query stored");

    Ok(Json(QueryEnvelope { query: record }))
}

/// GET /api/query and GET /api/query?id=
pub(super) async fn handle_list_queries(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(lookup): Query<QueryLookup>,
) -> Result<Json<QueryListing>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    match lookup.id.filter(|id| !id.is_empty()) {
        Some(id) => {
            let record = state
                .store
                .get_query(&id, &user.id)
                .await?
                .ok_or(ApiError::NotFound)?;
            Ok(Json(QueryListing::One(record)))
        }
        None => Ok(Json(QueryListing::Many(
            state.store.list_queries(&user.id).await?,
        ))),
    }
}

/// GET /api/query/{id}
pub(super) async fn handle_get_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<QueryRecord>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    let record = state
        .store
        .get_query(&id, &user.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(record))
}

/// DELETE /api/query/{id}
pub(super) async fn handle_delete_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    if !state.store.delete_query(&id, &user.id).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!(user_id = %user.id, query_id = %id, "query deleted");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Query deleted successfully".into(),
    }))
}
