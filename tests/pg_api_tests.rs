// tests/pg_api_tests.rs
//
// Full-stack tests against a real Postgres instance. Ignored by default;
// run with `cargo test -- --ignored` after exporting DATABASE_URL.

use driving_quiz_backend::{config::Config, routes, state::AppState};
use sqlx::postgres::PgPoolOptions;

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL and a pool for direct fixture setup.
async fn spawn_app() -> (String, sqlx::PgPool) {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "pg_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        default_pass_threshold: 3,
        pass_thresholds: Default::default(),
    };

    let state = AppState::new(pool.clone(), config);
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn register_and_login(address: &str, client: &reqwest::Client) -> String {
    let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
    let password = "password123";

    let response = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    login["token"].as_str().unwrap().to_string()
}

#[tokio::test]
#[ignore]
async fn full_submit_and_history_flow() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    // Fixture category (questions reference it by name on create).
    let category = format!("cat_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    sqlx::query("INSERT INTO categories (name) VALUES ($1)")
        .bind(&category)
        .execute(&pool)
        .await
        .unwrap();

    // Create one single-answer and one multi-answer question via the API.
    let single: serde_json::Value = client
        .post(format!("{}/api/questions", address))
        .json(&serde_json::json!({
            "text": "What does a red light mean?",
            "explanation": "Stop and wait.",
            "points": 1,
            "category": category,
            "correctAnswer": "a",
            "options": [
                { "letter": "a", "text": "Stop" },
                { "letter": "b", "text": "Go" }
            ],
            "licenseClass": "B"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let q1 = single["id"].as_i64().unwrap();

    let multi: serde_json::Value = client
        .post(format!("{}/api/questions", address))
        .json(&serde_json::json!({
            "text": "When must you use headlights?",
            "points": 2,
            "category": category,
            "correctAnswer": ["a", "c"],
            "options": [
                { "letter": "a", "text": "At night" },
                { "letter": "b", "text": "Never" },
                { "letter": "c", "text": "In tunnels" }
            ],
            "licenseClass": "B"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let q2 = multi["id"].as_i64().unwrap();

    let token = register_and_login(&address, &client).await;

    let mut user_answers = serde_json::Map::new();
    user_answers.insert(q1.to_string(), serde_json::json!("a"));
    user_answers.insert(q2.to_string(), serde_json::json!({ "c": true, "a": true }));

    let submitted: serde_json::Value = client
        .post(format!("{}/api/history", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "score": 3,
            "totalQuestions": 2,
            "status": "Passed",
            "questions": [{ "id": q1 }, { "id": q2 }],
            "userAnswers": user_answers,
            "classType": "B"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(submitted["score"], 3);
    assert_eq!(submitted["status"], "Passed");
    let history_id = submitted["id"].as_i64().unwrap();

    // Detail rows were committed with the attempt.
    let detail: serde_json::Value = client
        .get(format!("{}/api/history/details/{}", address, history_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["summary"]["score"], 3);
    assert_eq!(detail["details"].as_array().unwrap().len(), 2);

    let stats: serde_json::Value = client
        .get(format!("{}/api/history/stats/B", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalRealizados"], 1);
    assert_eq!(stats["totalAprobados"], 1);
}

#[tokio::test]
#[ignore]
async fn attempt_with_deleted_question_rolls_back_completely() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let category = format!("cat_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    sqlx::query("INSERT INTO categories (name) VALUES ($1)")
        .bind(&category)
        .execute(&pool)
        .await
        .unwrap();

    let created: serde_json::Value = client
        .post(format!("{}/api/questions", address))
        .json(&serde_json::json!({
            "text": "Placeholder?",
            "points": 1,
            "category": category,
            "correctAnswer": "a",
            "options": [{ "letter": "a", "text": "Yes" }],
            "licenseClass": "B"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let q1 = created["id"].as_i64().unwrap();

    let token = register_and_login(&address, &client).await;

    // A paper referencing a question that no longer exists must not leave
    // any rows behind.
    let mut user_answers = serde_json::Map::new();
    user_answers.insert(q1.to_string(), serde_json::json!("a"));

    let response = client
        .post(format!("{}/api/history", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "questions": [{ "id": q1 }, { "id": 99999999 }],
            "userAnswers": user_answers,
            "classType": "B"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);

    let list: serde_json::Value = client
        .get(format!("{}/api/history/B", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.as_array().unwrap().is_empty());
}
