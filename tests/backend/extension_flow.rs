use std::sync::Arc;

use crate::harness::{ADA_TOKEN, ScriptedGenerator, TWO_SUM_PAGE, TestBackend};
use lextro::api::{AnswerType, ExplanationLanguage, SESSION_COOKIE};
use lextro::config::ExtensionConfig;
use lextro::error::PanelError;
use lextro::extension::{
    Cookie, ExtensionRuntime, MemoryCookieJar, PageSnapshot, PanelContent, PanelController,
    PanelState, RequestKind, SubmitOptions,
};

const PROBLEM_URL: &str = "https://leetcode.com/problems/two-sum/";

fn start_runtime(server: &TestBackend, cookies: Arc<MemoryCookieJar>) -> ExtensionRuntime {
    let config = ExtensionConfig {
        backend_url: server.base_url(),
        ..ExtensionConfig::default()
    };
    ExtensionRuntime::start(&config, cookies).expect("runtime should start")
}

async fn settle(panel: &PanelController, state: PanelState) -> PanelState {
    if state.is_terminal() {
        return state;
    }
    let mut updates = panel.subscribe();
    loop {
        let current = updates.borrow_and_update().clone();
        if current.is_terminal() {
            return current;
        }
        updates.changed().await.expect("panel state channel open");
    }
}

#[tokio::test]
async fn page_to_explanation_to_history_round_trip() {
    let generator = ScriptedGenerator::answering();
    let server = TestBackend::start(generator.clone()).await;
    let cookies = Arc::new(MemoryCookieJar::new());
    cookies.set(Cookie::new(SESSION_COOKIE, "127.0.0.1", ADA_TOKEN));
    let runtime = start_runtime(&server, cookies);
    let panel = Arc::clone(&runtime.panel);

    runtime
        .open_page(PageSnapshot::new(PROBLEM_URL, TWO_SUM_PAGE))
        .await
        .unwrap();
    match settle(&panel, panel.request_problem_data().await).await {
        PanelState::Succeeded(PanelContent::Problem(snapshot)) => {
            assert_eq!(snapshot.title, "1. Two Sum");
            assert_eq!(snapshot.language, "python");
        }
        other => panic!("expected problem data, got {other:?}"),
    }

    let record = match panel
        .submit_query(SubmitOptions {
            answer_type: AnswerType::Code,
            explanation_language: ExplanationLanguage::English,
        })
        .await
    {
        PanelState::Succeeded(PanelContent::Explanation(record)) => record,
        other => panic!("expected explanation, got {other:?}"),
    };
    assert_eq!(record.problem_title, "1. Two Sum");
    assert_eq!(record.difficulty, "easy");
    assert_eq!(record.url.as_deref(), Some(PROBLEM_URL));
    assert_eq!(record.explanation, "Explanation of 1. Two Sum in python (code)");
    assert_eq!(generator.calls(), 1);

    match panel.list_queries().await {
        PanelState::Succeeded(PanelContent::History(records)) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, record.id);
        }
        other => panic!("expected history, got {other:?}"),
    }

    match panel.load_query(record.id.clone()).await {
        PanelState::Succeeded(PanelContent::Explanation(loaded)) => assert_eq!(loaded, record),
        other => panic!("expected stored explanation, got {other:?}"),
    }

    assert_eq!(
        panel.delete_query(record.id.clone()).await,
        PanelState::Succeeded(PanelContent::Deleted {
            id: record.id.clone()
        })
    );
    assert_eq!(
        panel.load_query(record.id.clone()).await,
        PanelState::Failed {
            kind: RequestKind::QueryLookup,
            error: PanelError::NotFound,
        }
    );

    runtime.shutdown();
}

#[tokio::test]
async fn signing_in_after_a_rejection_lets_manual_retry_succeed() {
    let server = TestBackend::start(ScriptedGenerator::answering()).await;
    let cookies = Arc::new(MemoryCookieJar::new());
    let runtime = start_runtime(&server, Arc::clone(&cookies));
    let panel = Arc::clone(&runtime.panel);
    runtime
        .open_page(PageSnapshot::new(PROBLEM_URL, TWO_SUM_PAGE))
        .await
        .unwrap();

    assert_eq!(
        settle(&panel, panel.request_problem_data().await).await,
        PanelState::Failed {
            kind: RequestKind::ProblemData,
            error: PanelError::Unauthenticated,
        }
    );

    cookies.set(Cookie::new(SESSION_COOKIE, "127.0.0.1", ADA_TOKEN));
    assert!(matches!(
        settle(&panel, panel.retry().await).await,
        PanelState::Succeeded(PanelContent::Problem(_))
    ));

    runtime.shutdown();
}
