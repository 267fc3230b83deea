// Typed wrappers over the backend's `/resume/*` routes.

use serde::Serialize;

use crate::api_client::{ApiClient, ApiRequest};
use crate::errors::ApiError;
use crate::files::FileCandidate;
use crate::models::{
    AnalysisResult, DeleteResponse, JobMatchResponse, Match, MatchDetail, Resume, ResumeDetail,
    Stats,
};

/// Multipart field name the upload route reads.
pub const UPLOAD_FIELD: &str = "file";

#[derive(Debug, Serialize)]
struct MatchRequest<'a> {
    resume_id: i64,
    job_description: &'a str,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    resume_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    job_description: Option<&'a str>,
}

impl ApiClient {
    /// GET /resume/stats
    pub async fn get_stats(&self) -> Result<Stats, ApiError> {
        self.call_json("/resume/stats", &ApiRequest::get()).await
    }

    /// GET /resume/resumes
    pub async fn get_resumes(&self) -> Result<Vec<Resume>, ApiError> {
        self.call_json("/resume/resumes", &ApiRequest::get()).await
    }

    /// GET /resume/resume/:id
    pub async fn get_resume_by_id(&self, id: i64) -> Result<ResumeDetail, ApiError> {
        self.call_json(&format!("/resume/resume/{id}"), &ApiRequest::get())
            .await
    }

    /// DELETE /resume/resume/:id
    pub async fn delete_resume(&self, id: i64) -> Result<DeleteResponse, ApiError> {
        self.call(&format!("/resume/resume/{id}"), &ApiRequest::delete())
            .await
            .map(delete_response)
    }

    /// POST /resume/upload
    pub async fn upload_resume(&self, file: &FileCandidate) -> Result<ResumeDetail, ApiError> {
        let request = ApiRequest::post_file(UPLOAD_FIELD, file.clone());
        self.call_json("/resume/upload", &request).await
    }

    /// GET /resume/matches
    pub async fn get_matches(&self) -> Result<Vec<Match>, ApiError> {
        self.call_json("/resume/matches", &ApiRequest::get()).await
    }

    /// GET /resume/match/:id
    pub async fn get_match_by_id(&self, id: i64) -> Result<MatchDetail, ApiError> {
        self.call_json(&format!("/resume/match/{id}"), &ApiRequest::get())
            .await
    }

    /// DELETE /resume/match/:id
    pub async fn delete_match(&self, id: i64) -> Result<DeleteResponse, ApiError> {
        self.call(&format!("/resume/match/{id}"), &ApiRequest::delete())
            .await
            .map(delete_response)
    }

    /// POST /resume/match
    pub async fn create_match(
        &self,
        resume_id: i64,
        job_description: &str,
    ) -> Result<JobMatchResponse, ApiError> {
        let request = ApiRequest::post_json(&MatchRequest {
            resume_id,
            job_description,
        })?;
        self.call_json("/resume/match", &request).await
    }

    /// POST /resume/analyze
    pub async fn get_analysis(
        &self,
        resume_id: i64,
        job_description: Option<&str>,
    ) -> Result<AnalysisResult, ApiError> {
        let request = ApiRequest::post_json(&AnalyzeRequest {
            resume_id,
            job_description,
        })?;
        self.call_json("/resume/analyze", &request).await
    }
}

// Delete routes answer `{"message": ...}`, but a bare text or empty body is
// still a successful delete.
fn delete_response(payload: crate::api_client::ApiPayload) -> DeleteResponse {
    use crate::api_client::ApiPayload;

    match payload {
        ApiPayload::Json(value) => serde_json::from_value(value.clone()).unwrap_or(DeleteResponse {
            message: value.to_string(),
        }),
        ApiPayload::Text(message) => DeleteResponse { message },
    }
}
