#![allow(dead_code)]

use std::time::Duration;

use resumatch::api_client::{ApiClient, ClientOptions, RetryPolicy};
use resumatch::state::AppState;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Real retry budget, but short delays so failing paths stay quick.
pub fn fast_options() -> ClientOptions {
    ClientOptions {
        timeout: Duration::from_secs(2),
        retries: 2,
        retry_delay: Duration::from_millis(10),
        retry_policy: RetryPolicy::Always,
    }
}

pub fn client(server: &MockServer) -> ApiClient {
    ApiClient::with_options(server.uri(), fast_options()).expect("client builds")
}

pub fn app_state(server: &MockServer) -> AppState {
    AppState::new(client(server))
}

pub fn resume_json(id: i64, filename: &str, skills: &[&str]) -> Value {
    json!({
        "id": id,
        "filename": filename,
        "skills": skills,
        "education": ["BSc Computer Science"],
        "experience": ["Acme Corp"],
        "created_at": "2025-04-01T09:30:00Z"
    })
}

pub fn detail_json(id: i64, filename: &str, skills: &[&str]) -> Value {
    json!({
        "id": id,
        "filename": filename,
        "text": "Full resume text",
        "skills": skills,
        "education": [],
        "experience": [],
        "embeddings": [0.25, 0.5]
    })
}

pub fn match_json(id: i64, jd: &str, filename: Option<&str>) -> Value {
    json!({
        "id": id,
        "jd_text": jd,
        "jd_skills": ["rust", "sql"],
        "match_score": 50.0,
        "missing_skills": ["sql"],
        "resume_filename": filename,
        "created_at": "2025-04-02T10:00:00"
    })
}

/// Polls `check` until it holds or the deadline passes.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
