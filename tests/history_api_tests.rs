// tests/history_api_tests.rs
//
// End-to-end tests for the history endpoints, run against in-memory store
// fakes injected through AppState. No database is required.

mod common;

use std::sync::Arc;

use common::{
    InMemoryHistoryStore, InMemoryQuestionStore, TEST_JWT_SECRET, spawn_app, test_config,
    test_state,
};
use driving_quiz_backend::models::question::{QuestionOption, QuestionRow, QuestionView};
use driving_quiz_backend::utils::jwt::sign_jwt;

fn option(letter: &str, text: &str) -> QuestionOption {
    QuestionOption {
        letter: letter.to_string(),
        text: text.to_string(),
    }
}

/// q1: single-answer, 1 point, correct 'a'.
/// q2: multi-answer, 2 points, correct {'a','c'}.
fn sample_questions() -> Vec<QuestionView> {
    vec![
        QuestionView {
            row: QuestionRow {
                id: 1,
                text: "What does a red light mean?".to_string(),
                explanation: Some("Stop and wait.".to_string()),
                points: 1,
                category: "Signals".to_string(),
                license_class: "B".to_string(),
                correct_option: Some("a".to_string()),
                correct_options: None,
            },
            options: vec![option("a", "Stop"), option("b", "Go"), option("c", "Yield")],
        },
        QuestionView {
            row: QuestionRow {
                id: 2,
                text: "When must you use headlights?".to_string(),
                explanation: None,
                points: 2,
                category: "Lighting".to_string(),
                license_class: "B".to_string(),
                correct_option: None,
                correct_options: Some(vec!["a".to_string(), "c".to_string()]),
            },
            options: vec![
                option("a", "At night"),
                option("b", "Never"),
                option("c", "In tunnels"),
            ],
        },
    ]
}

fn default_state() -> driving_quiz_backend::state::AppState {
    let questions = sample_questions();
    test_state(
        test_config(),
        Arc::new(InMemoryQuestionStore::new(questions.clone())),
        Arc::new(InMemoryHistoryStore::new(questions)),
    )
}

fn bearer(user_id: i64) -> String {
    let token = sign_jwt(user_id, "driver@example.com", TEST_JWT_SECRET, 600).unwrap();
    format!("Bearer {}", token)
}

fn submit_payload() -> serde_json::Value {
    serde_json::json!({
        "score": 3,
        "totalQuestions": 2,
        "status": "Passed",
        "questions": [{ "id": 1 }, { "id": 2 }],
        "userAnswers": {
            "1": "a",
            "2": { "a": true, "b": false, "c": true }
        },
        "classType": "B"
    })
}

#[tokio::test]
async fn submit_without_token_is_unauthorized() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/history", address))
        .json(&submit_payload())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn submit_grades_and_persists_attempt() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&submit_payload())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 3);
    assert_eq!(body["status"], "Passed");
    let id = body["id"].as_i64().unwrap();

    // The attempt shows up in the class history, newest first.
    let list: serde_json::Value = client
        .get(format!("{}/api/history/B", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"].as_i64().unwrap(), id);
    assert_eq!(list[0]["score"], 3);
    assert_eq!(list[0]["status"], "Passed");
    assert_eq!(list[0]["total_questions"], 2);
}

#[tokio::test]
async fn server_overrides_client_asserted_score() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    // All answers wrong, but the client claims a perfect passing score.
    let payload = serde_json::json!({
        "score": 99,
        "totalQuestions": 2,
        "status": "Passed",
        "questions": [{ "id": 1 }, { "id": 2 }],
        "userAnswers": {
            "1": "b",
            "2": { "b": true }
        },
        "classType": "B"
    });

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 0);
    assert_eq!(body["status"], "Failed");
}

#[tokio::test]
async fn duplicate_question_ids_score_only_once() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    // The 2-point multi question is listed twice with a correct answer;
    // it must still count only once, leaving the score below the
    // threshold of 3.
    let payload = serde_json::json!({
        "questions": [{ "id": 2 }, { "id": 2 }],
        "userAnswers": {
            "2": { "a": true, "c": true }
        },
        "classType": "B"
    });

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 2);
    assert_eq!(body["status"], "Failed");

    // The recorded attempt reflects the deduplicated paper.
    let list: serde_json::Value = client
        .get(format!("{}/api/history/B", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list[0]["score"], 2);
    assert_eq!(list[0]["total_questions"], 1);
}

#[tokio::test]
async fn unanswered_questions_score_zero_points() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    // q2 is answered correctly, q1 is absent from the answer map.
    let payload = serde_json::json!({
        "score": 2,
        "totalQuestions": 2,
        "status": "Failed",
        "questions": [{ "id": 1 }, { "id": 2 }],
        "userAnswers": {
            "2": { "a": true, "c": true }
        },
        "classType": "B"
    });

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["score"], 2);
    assert_eq!(body["status"], "Failed");
}

#[tokio::test]
async fn submit_without_questions_is_rejected() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "score": 0,
        "totalQuestions": 0,
        "status": "Failed",
        "userAnswers": {},
        "classType": "B"
    });

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn unknown_question_id_fails_before_persisting() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let payload = serde_json::json!({
        "questions": [{ "id": 1 }, { "id": 999 }],
        "userAnswers": { "1": "a" },
        "classType": "B"
    });

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&payload)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);

    // Nothing was recorded.
    let list: serde_json::Value = client
        .get(format!("{}/api/history/B", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn failed_write_leaves_no_partial_attempt() {
    let questions = sample_questions();
    let state = test_state(
        test_config(),
        Arc::new(InMemoryQuestionStore::new(questions.clone())),
        Arc::new(InMemoryHistoryStore::failing(questions)),
    );
    let address = spawn_app(state).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&submit_payload())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 500);

    let list: serde_json::Value = client
        .get(format!("{}/api/history/B", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn detail_view_joins_questions_and_parses_answers() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&submit_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    let detail: serde_json::Value = client
        .get(format!("{}/api/history/details/{}", address, id))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(detail["summary"]["id"].as_i64().unwrap(), id);
    assert_eq!(detail["summary"]["score"], 3);
    assert_eq!(detail["summary"]["totalQuestions"], 2);
    assert_eq!(detail["summary"]["status"], "Passed");

    let details = detail["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);

    let single = &details[0];
    assert_eq!(single["isCorrect"], true);
    assert_eq!(single["userAnswer"], "a");
    assert_eq!(single["question"]["id"], 1);
    assert_eq!(single["question"]["multi"], false);
    assert_eq!(single["question"]["correctAnswer"], "a");

    // Multi answers come back as a sorted array regardless of how the
    // checkboxes were ticked.
    let multi = &details[1];
    assert_eq!(multi["isCorrect"], true);
    assert_eq!(multi["userAnswer"], serde_json::json!(["a", "c"]));
    assert_eq!(multi["question"]["multi"], true);
    assert_eq!(
        multi["correctAnswerSnapshot"],
        serde_json::json!(["a", "c"])
    );
}

#[tokio::test]
async fn detail_of_foreign_attempt_is_not_found() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    let created: serde_json::Value = client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&submit_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_i64().unwrap();

    // User 2 must not see user 1's attempt.
    let response = client
        .get(format!("{}/api/history/details/{}", address, id))
        .header("Authorization", bearer(2))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn stats_count_attempts_and_passes_per_class() {
    let address = spawn_app(default_state()).await;
    let client = reqwest::Client::new();

    // One pass...
    client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&submit_payload())
        .send()
        .await
        .unwrap();

    // ...and one fail.
    let failing = serde_json::json!({
        "questions": [{ "id": 1 }, { "id": 2 }],
        "userAnswers": { "1": "b" },
        "classType": "B"
    });
    client
        .post(format!("{}/api/history", address))
        .header("Authorization", bearer(1))
        .json(&failing)
        .send()
        .await
        .unwrap();

    let stats: serde_json::Value = client
        .get(format!("{}/api/history/stats/B", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["totalRealizados"], 2);
    assert_eq!(stats["totalAprobados"], 1);

    // Another class starts from zero.
    let stats_c: serde_json::Value = client
        .get(format!("{}/api/history/stats/C", address))
        .header("Authorization", bearer(1))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats_c["totalRealizados"], 0);
    assert_eq!(stats_c["totalAprobados"], 0);
}
