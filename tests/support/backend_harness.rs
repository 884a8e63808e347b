#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lextro::backend::store::ExternalIdentity;
use lextro::backend::validation::ValidatedQuery;
use lextro::backend::{
    AppState, ExplanationGenerator, SqliteQueryStore, StaticSessionResolver,
    run_server_with_listener,
};
use lextro::error::GenerationError;
use reqwest::StatusCode;
use sqlx::sqlite::SqlitePoolOptions;

pub const ADA_TOKEN: &str = "tok_ada";
pub const BOB_TOKEN: &str = "tok_bob";

/// Generator that answers from a script instead of calling out.
pub struct ScriptedGenerator {
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn answering() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ExplanationGenerator for ScriptedGenerator {
    fn generate<'a>(
        &'a self,
        query: &'a ValidatedQuery,
    ) -> Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GenerationError::Empty);
            }
            Ok(format!(
                "Explanation of {} in {} ({})",
                query.problem_title, query.language, query.answer_type
            ))
        })
    }
}

pub struct TestBackend {
    pub port: u16,
    handle: tokio::task::JoinHandle<anyhow::Result<()>>,
}

impl TestBackend {
    pub async fn start(generator: Arc<ScriptedGenerator>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("ephemeral backend listener should bind");
        let port = listener
            .local_addr()
            .expect("listener should expose local address")
            .port();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite should open");
        let store = SqliteQueryStore::new(pool)
            .await
            .expect("schema should be created");
        let sessions = StaticSessionResolver::new(vec![
            (
                ADA_TOKEN.to_string(),
                ExternalIdentity {
                    external_id: "user_ada".into(),
                    email: "ada@example.com".into(),
                    first_name: Some("Ada".into()),
                },
            ),
            (
                BOB_TOKEN.to_string(),
                ExternalIdentity {
                    external_id: "user_bob".into(),
                    email: "bob@example.com".into(),
                    first_name: None,
                },
            ),
        ]);

        let state = AppState {
            store: Arc::new(store),
            generator,
            sessions: Arc::new(sessions),
        };
        let handle =
            tokio::spawn(async move { run_server_with_listener(listener, state, &[]).await });

        wait_until_ready(port).await;
        Self { port, handle }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url())
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn wait_until_ready(port: u16) {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(200))
        .build()
        .expect("reqwest client should be built");

    for _ in 0..80 {
        let health = client
            .get(format!("http://127.0.0.1:{port}/health"))
            .send()
            .await;
        if matches!(health, Ok(resp) if resp.status() == StatusCode::OK) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("backend did not become ready on port {port}");
}

pub const TWO_SUM_PAGE: &str = r#"
<html>
<head><title>Two Sum - LeetCode</title></head>
<body>
  <div data-cy="question-title">1. Two Sum</div>
  <div diff="">Easy</div>
  <div data-cy="description">
    <p>Given an array of integers <code>nums</code> and an integer
    <code>target</code>, return indices of the two numbers.</p>
    <pre>Input: nums = [2,7,11,15], target = 9
Output: [0,1]</pre>
    <ul><li>Only one valid answer exists.</li></ul>
  </div>
  <div class="monaco-editor" data-language="python">
    <div class="view-lines">
      <div class="view-line">class Solution:</div>
      <div class="view-line">    def twoSum(self, nums, target):</div>
    </div>
  </div>
</body>
</html>
"#;
