mod common;

use std::sync::Arc;

use resumatch::pages::Navigation;
use resumatch::realtime::BroadcastFeed;
use resumatch::shell::Shell;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{app_state, detail_json, match_json, resume_json};

async fn run_script(shell: &mut Shell, script: &str) -> String {
    let mut out = Vec::new();
    shell.run(script.as_bytes(), &mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_select_and_match_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            resume_json(1, "alice.pdf", &["python"]),
            resume_json(2, "bob.pdf", &["rust", "sql"]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resume/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(2, "bob.pdf", &["rust", "sql"])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resume/match"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jd_text": "Rust backend",
            "jd_skills": ["rust", "kafka"],
            "match_score": 85.0,
            "missing_skills": ["kafka"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/matches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            match_json(9, "Rust backend", Some("bob.pdf")),
        ])))
        .mount(&server)
        .await;

    let state = app_state(&server);
    let mut shell = Shell::new(state.clone(), Arc::new(BroadcastFeed::new()));
    let output = run_script(
        &mut shell,
        "resumes rust\nselect 2\njd Rust backend\nmatch\nmatches kafka\nfrobnicate\nquit\n",
    )
    .await;

    assert!(output.contains("#2     bob.pdf  [rust, sql]"), "{output}");
    assert!(!output.contains("alice.pdf  [python]"), "{output}");
    assert!(output.contains("Selected: #2 bob.pdf [rust, sql]"), "{output}");
    assert!(output.contains("Job description set (12 / 5000 characters)."), "{output}");
    assert!(output.contains("Score: 85.0 (Excellent Match)"), "{output}");
    assert!(output.contains("Matched skills: rust"), "{output}");
    assert!(output.contains("[ok] Analysis complete!"), "{output}");
    assert!(output.contains("No matches match 'kafka'."), "{output}");
    assert!(output.contains("Unknown command"), "{output}");

    assert_eq!(shell.current(), Navigation::Matches);
    assert_eq!(state.selection.id(), Some(2));
}

#[tokio::test]
async fn test_leaving_dashboard_releases_subscription() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_resumes": 0,
            "total_matches": 0,
            "avg_score": 0.0,
            "success_rate": 0.0
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let feed = BroadcastFeed::new();
    let mut shell = Shell::new(app_state(&server), Arc::new(feed.clone()));

    let output = run_script(&mut shell, "dashboard\n").await;
    assert!(output.contains("Resumes: 0  Matches: 0"), "{output}");
    assert!(output.contains("No resumes uploaded yet."), "{output}");
    // End of input tears the live dashboard down.
    assert_eq!(feed.listener_count(), 0);

    let output = run_script(&mut shell, "dashboard\nresumes\nquit\n").await;
    assert!(output.contains("Nothing here yet."), "{output}");
    assert_eq!(shell.current(), Navigation::Resumes);
    assert_eq!(feed.listener_count(), 0);
}

#[tokio::test]
async fn test_upload_of_unsupported_file_is_rejected_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resume/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "plain text").unwrap();

    let mut shell = Shell::new(app_state(&server), Arc::new(BroadcastFeed::new()));
    let output = run_script(&mut shell, &format!("upload {}\nquit\n", notes.display())).await;
    assert!(output.contains("[warning]"), "{output}");
    assert!(!output.contains("Uploading"), "{output}");
}

#[tokio::test]
async fn test_degraded_analysis_is_rendered_with_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resume/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(3, "cv.pdf", &["go"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            resume_json(3, "cv.pdf", &["go"]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resume/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Partial review",
            "strengths": ["Clear Go service ownership"],
            "weaknesses": ["No metrics on impact"],
            "suggestions": [],
            "score": 40,
            "error": "model offline"
        })))
        .mount(&server)
        .await;

    let mut shell = Shell::new(app_state(&server), Arc::new(BroadcastFeed::new()));
    let output = run_script(&mut shell, "select 3\njd Go platform engineer\nanalyze\nquit\n").await;

    assert!(
        output.contains(
            "[warning] AI analysis returned with an error. The coaching model may be offline."
        ),
        "{output}"
    );
    assert!(output.contains("Coaching score: 40"), "{output}");
    assert!(output.contains("Strengths:\n  - Clear Go service ownership"), "{output}");
    assert!(output.contains("Weaknesses:\n  - No metrics on impact"), "{output}");
    assert!(!output.contains("Suggestions:"), "{output}");
    assert!(!output.contains("[ok] AI coaching complete!"), "{output}");
}

#[tokio::test]
async fn test_selection_changes_are_announced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resume/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(detail_json(4, "dana.pdf", &["sql"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            resume_json(4, "dana.pdf", &["sql"]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/resume/resume/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Resume deleted"})))
        .mount(&server)
        .await;

    let state = app_state(&server);
    let mut shell = Shell::new(state.clone(), Arc::new(BroadcastFeed::new()));
    let output = run_script(&mut shell, "select 4\nhelp\nresumes\ndelete-resume 4\nquit\n").await;

    assert_eq!(output.matches("Current resume: #4 dana.pdf").count(), 1, "{output}");
    assert!(output.contains("Current resume cleared."), "{output}");
    assert!(state.selection.id().is_none());
}
