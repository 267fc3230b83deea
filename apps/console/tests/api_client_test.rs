mod common;

use std::time::Duration;

use resumatch::api_client::{ApiClient, ApiPayload, ApiRequest, ClientOptions, RetryPolicy};
use resumatch::errors::ApiError;
use resumatch::files::FileCandidate;
use serde_json::json;
use wiremock::matchers::{body_json, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{client, detail_json, fast_options, resume_json};

#[tokio::test]
async fn test_retries_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/resume/resumes"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([resume_json(1, "cv.pdf", &["rust"])])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let resumes = client(&server).get_resumes().await.unwrap();
    assert_eq!(resumes.len(), 1);
    assert_eq!(resumes[0].filename, "cv.pdf");
}

#[tokio::test]
async fn test_gives_up_after_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database down"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).get_stats().await.unwrap_err();
    match err {
        ApiError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, "database down");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_client_errors_are_retried_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resume/99"))
        .respond_with(ResponseTemplate::new(404).set_body_string("{\"detail\":\"Resume not found\"}"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).get_resume_by_id(99).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "API error: 404 Not Found - {\"detail\":\"Resume not found\"}"
    );
}

#[tokio::test]
async fn test_transient_only_policy_skips_client_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/resume/99"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::with_options(
        server.uri(),
        ClientOptions {
            retry_policy: RetryPolicy::TransientOnly,
            ..fast_options()
        },
    )
    .unwrap();
    let err = api.get_resume_by_id(99).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resume/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"total_resumes": 1, "total_matches": 0, "avg_score": 0.0, "success_rate": 0.0}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let api = ApiClient::with_options(
        server.uri(),
        ClientOptions {
            timeout: Duration::from_millis(100),
            retries: 1,
            retry_delay: Duration::from_millis(10),
            retry_policy: RetryPolicy::Always,
        },
    )
    .unwrap();
    let err = api.get_stats().await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(d) if d == Duration::from_millis(100)));
}

#[tokio::test]
async fn test_plain_text_body_is_returned_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
        .mount(&server)
        .await;

    let payload = client(&server)
        .call("/health", &ApiRequest::get())
        .await
        .unwrap();
    assert_eq!(payload, ApiPayload::Text("pong".into()));
}

#[tokio::test]
async fn test_json_post_sends_content_type_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resume/match"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"resume_id": 4, "job_description": "Backend engineer with Rust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jd_text": "Backend engineer with Rust",
            "jd_skills": ["rust", "postgres"],
            "match_score": 75.0,
            "missing_skills": ["postgres"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server)
        .create_match(4, "Backend engineer with Rust")
        .await
        .unwrap();
    assert_eq!(result.match_score, 75.0);
    assert_eq!(result.missing_skills, vec!["postgres".to_string()]);
}

#[tokio::test]
async fn test_analysis_without_description_omits_field() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resume/analyze"))
        .and(body_json(json!({"resume_id": 4})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "summary": "Good",
            "strengths": ["Rust"],
            "weaknesses": [],
            "suggestions": [],
            "score": 70
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analysis = client(&server).get_analysis(4, None).await.unwrap();
    assert_eq!(analysis.score, 70);
}

#[tokio::test]
async fn test_upload_is_multipart_without_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resume/upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detail_json(12, "cv.pdf", &["rust", "go"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let file = FileCandidate::new("cv.pdf", None, b"%PDF-1.7 test".to_vec());
    let resume = client(&server).upload_resume(&file).await.unwrap();
    assert_eq!(resume.id, 12);
    assert_eq!(resume.embeddings, vec![0.25, 0.5]);

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"file\""));
    assert!(body.contains("filename=\"cv.pdf\""));
    assert!(body.contains("application/pdf"));
}

#[tokio::test]
async fn test_retried_upload_resends_whole_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/resume/upload"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/resume/upload"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(detail_json(13, "cv.docx", &["sql"])),
        )
        .mount(&server)
        .await;

    let file = FileCandidate::new("cv.docx", None, b"PK\x03\x04 resume body".to_vec());
    let resume = client(&server).upload_resume(&file).await.unwrap();
    assert_eq!(resume.id, 13);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        let body = String::from_utf8_lossy(&request.body);
        assert!(body.contains("resume body"), "{body}");
        assert!(body.contains("filename=\"cv.docx\""), "{body}");
        assert!(body.contains("wordprocessingml.document"), "{body}");
    }
}

#[tokio::test]
async fn test_delete_accepts_message_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/resume/match/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Match deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).delete_match(3).await.unwrap();
    assert_eq!(response.message, "Match deleted");
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let api = ApiClient::with_options("http://127.0.0.1:9", fast_options()).unwrap();
    let err = api.get_matches().await.unwrap_err();
    assert!(err.is_transient(), "unexpected error: {err:?}");
}
