use crate::harness::{ADA_TOKEN, BOB_TOKEN, ScriptedGenerator, TestBackend};
use reqwest::StatusCode;
use serde_json::{Value, json};

fn two_sum_body() -> Value {
    json!({
        "problemTitle": "Two Sum",
        "difficulty": "easy",
        "language": "python",
        "answerType": "logical_explanation",
        "explanationLanguage": "Hinglish",
        "userCode": "class Solution: pass",
        "url": "https://leetcode.com/problems/two-sum/",
        "timestamp": "2026-01-01T00:00:00Z"
    })
}

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("error body should be json");
    body["error"]
        .as_str()
        .expect("error field should be a string")
        .to_string()
}

#[tokio::test]
async fn requests_without_a_known_session_are_unauthorized() {
    let server = TestBackend::start(ScriptedGenerator::answering()).await;
    let client = reqwest::Client::new();

    let anonymous = client.get(server.url("/api/user")).send().await.unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(anonymous).await, "Unauthorized");

    let forged = client
        .get(server.url("/api/query"))
        .bearer_auth("tok_unknown")
        .send()
        .await
        .unwrap();
    assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);
}

async fn fetch_user(client: &reqwest::Client, url: String, cookie: String) -> Value {
    client
        .get(url)
        .header("Cookie", cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn user_endpoint_syncs_identity_by_cookie() {
    let server = TestBackend::start(ScriptedGenerator::answering()).await;
    let client = reqwest::Client::new();
    let cookie = format!("theme=dark; __session={ADA_TOKEN}");

    let first = fetch_user(&client, server.url("/api/user"), cookie.clone()).await;
    let second = fetch_user(&client, server.url("/api/user"), cookie).await;

    assert_eq!(first["name"], "Ada");
    assert_eq!(first["email"], "ada@example.com");
    assert_eq!(first["id"], second["id"], "upsert must keep the same user row");

    let bob = fetch_user(&client, server.url("/api/user"), format!("__session={BOB_TOKEN}")).await;
    assert_eq!(bob["name"], "User");
}

#[tokio::test]
async fn bogus_answer_type_is_rejected_with_valid_values() {
    let generator = ScriptedGenerator::answering();
    let server = TestBackend::start(generator.clone()).await;

    let mut body = two_sum_body();
    body["answerType"] = json!("bogus");
    let response = reqwest::Client::new()
        .post(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .json(&body)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let message = error_message(response).await;
    for value in ["code", "logical_explanation", "company_approach"] {
        assert!(message.contains(value), "{message} should list {value}");
    }
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let server = TestBackend::start(ScriptedGenerator::answering()).await;
    let response = reqwest::Client::new()
        .post(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn generation_failure_is_a_bad_gateway() {
    let server = TestBackend::start(ScriptedGenerator::failing()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .json(&two_sum_body())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_message(response).await, "Failed to generate explanation");

    let history: Vec<Value> = client
        .get(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(history.is_empty(), "failed generations are not stored");
}

#[tokio::test]
async fn query_lifecycle_is_scoped_to_the_owner() {
    let server = TestBackend::start(ScriptedGenerator::answering()).await;
    let client = reqwest::Client::new();

    let created: Value = client
        .post(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .json(&two_sum_body())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let query = &created["query"];
    let id = query["id"].as_str().unwrap().to_string();
    assert_eq!(query["problemTitle"], "Two Sum");
    assert_eq!(query["answerType"], "logical_explanation");
    assert_eq!(query["explanationLanguage"], "hinglish");
    assert_eq!(
        query["explanation"],
        "Explanation of Two Sum in python (logical_explanation)"
    );

    let second: Value = client
        .post(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .json(&json!({ "problemTitle": "LRU Cache" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["query"]["difficulty"], "medium");
    assert_eq!(second["query"]["language"], "javascript");
    assert_eq!(second["query"]["answerType"], "code");

    let history: Vec<Value> = client
        .get(server.url("/api/query"))
        .bearer_auth(ADA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["problemTitle"], "LRU Cache", "newest first");

    let by_param: Value = client
        .get(server.url("/api/query"))
        .query(&[("id", id.as_str())])
        .bearer_auth(ADA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_param["id"], id.as_str());

    let foreign = client
        .get(server.url(&format!("/api/query/{id}")))
        .bearer_auth(BOB_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        error_message(foreign).await,
        "Query not found or access denied"
    );

    let foreign_delete = client
        .delete(server.url(&format!("/api/query/{id}")))
        .bearer_auth(BOB_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(foreign_delete.status(), StatusCode::NOT_FOUND);

    let deleted: Value = client
        .delete(server.url(&format!("/api/query/{id}")))
        .bearer_auth(ADA_TOKEN)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(
        deleted,
        json!({ "success": true, "message": "Query deleted successfully" })
    );

    let gone = client
        .get(server.url(&format!("/api/query/{id}")))
        .bearer_auth(ADA_TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
