//! End-to-end tests over a real socket and a real database.
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

use fitcoach::{
    AppConfig, AppState, create_router,
    repository::{PostgresRepository, RepositoryState},
};
use reqwest::{StatusCode, redirect::Policy};
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    dotenv::dotenv().ok();

    let db_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set to run API tests");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await
        .expect("Failed to connect to Postgres in tests");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations.");

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;
    let config = AppConfig {
        db_url,
        ..AppConfig::default()
    };
    let router = create_router(AppState::new(repo, config).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap();

    TestApp { address, client }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Signs up with a unique email and returns (user id, token).
    async fn register(&self, role: &str) -> (String, String) {
        let email = format!("{}-{}@example.com", role, Uuid::new_v4().simple());

        let user: Value = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({ "name": role, "email": email, "password": "pw-123456", "type": role }))
            .send()
            .await
            .expect("req fail")
            .json()
            .await
            .unwrap();

        let session: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": "pw-123456" }))
            .send()
            .await
            .expect("req fail")
            .json()
            .await
            .unwrap();

        (
            user["id"].as_str().unwrap().to_string(),
            session["token"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
#[ignore]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/health")).send().await.expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore]
async fn test_page_requests_redirect_to_login() {
    let app = spawn_app().await;
    let response = app.client.get(app.url("/dashboard")).send().await.expect("req fail");

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()["location"],
        "/login?callbackUrl=%2Fdashboard"
    );
}

#[tokio::test]
#[ignore]
async fn test_workout_lifecycle() {
    let app = spawn_app().await;
    let (_, trainer) = app.register("trainer").await;
    let (student_id, student) = app.register("student").await;

    let exercise: Value = app
        .client
        .post(app.url("/api/exercises"))
        .bearer_auth(&trainer)
        .json(&json!({ "name": "Bench press", "reps": 8, "sets": 4 }))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    let exercise_id = exercise["id"].as_str().unwrap();

    let response = app
        .client
        .post(app.url("/api/workouts"))
        .bearer_auth(&trainer)
        .json(&json!({ "name_plan": "Chest", "user": student_id, "workouts": [exercise_id] }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::CREATED);
    let workout: Value = response.json().await.unwrap();
    let path = format!("/api/workouts/{}", workout["id"].as_str().unwrap());

    let response = app
        .client
        .patch(app.url(&path))
        .bearer_auth(&student)
        .json(&json!({ "completed_exercises": [exercise_id] }))
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["completed_exercises"], json!([exercise_id]));

    let response = app
        .client
        .delete(app.url(&path))
        .bearer_auth(&student)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .client
        .delete(app.url(&path))
        .bearer_auth(&trainer)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&path))
        .bearer_auth(&student)
        .send()
        .await
        .expect("req fail");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_diet_intake_lifecycle() {
    let app = spawn_app().await;
    let (_, nutritionist) = app.register("nutritionist").await;
    let (student_id, student) = app.register("student").await;

    let diet: Value = app
        .client
        .post(app.url("/api/diets"))
        .bearer_auth(&nutritionist)
        .json(&json!({
            "student": student_id,
            "name_plan": "Recomp",
            "water_meta": 2500,
            "calories_meta": 2300,
        }))
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    let intake = format!("/api/diets/{}/intake", diet["id"].as_str().unwrap());

    for _ in 0..2 {
        let response = app
            .client
            .post(app.url(&intake))
            .bearer_auth(&student)
            .json(&json!({ "water": 250, "calories": 400 }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let listed: Value = app
        .client
        .get(app.url("/api/diets"))
        .bearer_auth(&student)
        .send()
        .await
        .expect("req fail")
        .json()
        .await
        .unwrap();
    let plans = listed.as_array().unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0]["water_count"].as_f64(), Some(500.0));
    assert_eq!(plans[0]["calories_count"].as_f64(), Some(800.0));
}
