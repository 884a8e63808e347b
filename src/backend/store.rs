use crate::api::{AnswerType, ExplanationLanguage, QueryRecord};
use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use uuid::Uuid;

/// A backend user, keyed by the identity provider's id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
}

/// Identity as reported by the session resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    pub external_id: String,
    pub email: String,
    pub first_name: Option<String>,
}

impl ExternalIdentity {
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("User")
    }
}

/// Everything needed to persist a generated explanation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuery {
    pub problem_title: String,
    pub difficulty: String,
    pub language: String,
    pub answer_type: AnswerType,
    pub explanation_language: ExplanationLanguage,
    pub user_code: Option<String>,
    pub url: Option<String>,
    pub explanation: String,
}

/// Async persistence contract for users and their queries.
///
/// Lookups and deletes are always scoped to the owning user; a query that
/// exists but belongs to someone else is indistinguishable from a missing one.
pub trait QueryStore: Send + Sync {
    fn upsert_user<'a>(
        &'a self,
        identity: &'a ExternalIdentity,
    ) -> Pin<Box<dyn Future<Output = Result<UserRecord>> + Send + 'a>>;

    fn insert_query<'a>(
        &'a self,
        user_id: &'a str,
        query: NewQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryRecord>> + Send + 'a>>;

    fn list_queries<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<QueryRecord>>> + Send + 'a>>;

    fn get_query<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<QueryRecord>>> + Send + 'a>>;

    fn delete_query<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;
}

/// Open (creating if needed) the SQLite database at `url`.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("parse database url {url}"))?
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("open database {url}"))
}

/// SQLite-backed store using an sqlx pool.
pub struct SqliteQueryStore {
    pool: SqlitePool,
}

impl SqliteQueryStore {
    /// Wrap an existing pool and create the schema.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        sqlx::query("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                 id TEXT PRIMARY KEY,
                 external_id TEXT NOT NULL UNIQUE,
                 email TEXT NOT NULL,
                 name TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create users table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS queries (
                 id TEXT PRIMARY KEY,
                 user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                 problem_title TEXT NOT NULL,
                 difficulty TEXT NOT NULL,
                 language TEXT NOT NULL,
                 answer_type TEXT NOT NULL,
                 explanation_language TEXT NOT NULL,
                 user_code TEXT,
                 url TEXT,
                 explanation TEXT NOT NULL,
                 created_at TEXT NOT NULL
             )",
        )
        .execute(&pool)
        .await
        .context("create queries table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_queries_user
                 ON queries(user_id, created_at)",
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Fixed-width UTC timestamps so lexical order matches time order.
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_user_row(row: &SqliteRow) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_query_row(row: &SqliteRow) -> Result<QueryRecord> {
    let answer_type_raw: String = row.try_get("answer_type")?;
    let language_raw: String = row.try_get("explanation_language")?;

    Ok(QueryRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        problem_title: row.try_get("problem_title")?,
        difficulty: row.try_get("difficulty")?,
        language: row.try_get("language")?,
        answer_type: AnswerType::from_str(&answer_type_raw)
            .map_err(|_| anyhow!("unknown answer type: {answer_type_raw}"))?,
        explanation_language: ExplanationLanguage::from_str(&language_raw)
            .map_err(|_| anyhow!("unknown explanation language: {language_raw}"))?,
        user_code: row.try_get("user_code")?,
        url: row.try_get("url")?,
        explanation: row.try_get("explanation")?,
        created_at: row.try_get("created_at")?,
    })
}

const QUERY_COLUMNS: &str = "id, user_id, problem_title, difficulty, language, answer_type,
     explanation_language, user_code, url, explanation, created_at";

impl QueryStore for SqliteQueryStore {
    fn upsert_user<'a>(
        &'a self,
        identity: &'a ExternalIdentity,
    ) -> Pin<Box<dyn Future<Output = Result<UserRecord>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO users (id, external_id, email, name, created_at)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT(external_id) DO UPDATE
                 SET email = excluded.email, name = excluded.name",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&identity.external_id)
            .bind(&identity.email)
            .bind(identity.display_name())
            .bind(now_timestamp())
            .execute(&self.pool)
            .await
            .context("upsert user")?;

            let row = sqlx::query(
                "SELECT id, external_id, email, name, created_at
                 FROM users
                 WHERE external_id = $1",
            )
            .bind(&identity.external_id)
            .fetch_one(&self.pool)
            .await
            .context("load upserted user")?;

            map_user_row(&row)
        })
    }

    fn insert_query<'a>(
        &'a self,
        user_id: &'a str,
        query: NewQuery,
    ) -> Pin<Box<dyn Future<Output = Result<QueryRecord>> + Send + 'a>> {
        Box::pin(async move {
            let record = QueryRecord {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                problem_title: query.problem_title,
                difficulty: query.difficulty,
                language: query.language,
                answer_type: query.answer_type,
                explanation_language: query.explanation_language,
                user_code: query.user_code,
                url: query.url,
                explanation: query.explanation,
                created_at: now_timestamp(),
            };
            let answer_type: &'static str = record.answer_type.into();
            let explanation_language: &'static str = record.explanation_language.into();

            sqlx::query(
                "INSERT INTO queries (id, user_id, problem_title, difficulty, language, answer_type,
                     explanation_language, user_code, url, explanation, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(&record.id)
            .bind(&record.user_id)
            .bind(&record.problem_title)
            .bind(&record.difficulty)
            .bind(&record.language)
            .bind(answer_type)
            .bind(explanation_language)
            .bind(&record.user_code)
            .bind(&record.url)
            .bind(&record.explanation)
            .bind(&record.created_at)
            .execute(&self.pool)
            .await
            .context("insert query")?;

            Ok(record)
        })
    }

    fn list_queries<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<QueryRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {QUERY_COLUMNS}
                 FROM queries
                 WHERE user_id = $1
                 ORDER BY created_at DESC, rowid DESC"
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .context("list queries")?;

            rows.iter().map(map_query_row).collect()
        })
    }

    fn get_query<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<QueryRecord>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {QUERY_COLUMNS}
                 FROM queries
                 WHERE id = $1 AND user_id = $2"
            ))
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("query by id")?;

            row.map(|r| map_query_row(&r)).transpose()
        })
    }

    fn delete_query<'a>(
        &'a self,
        id: &'a str,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM queries WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .context("delete query")?;
            Ok(result.rows_affected() > 0)
        })
    }
}
