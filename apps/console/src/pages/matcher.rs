use std::sync::Mutex;

use tracing::{info, warn};

use crate::errors::{user_message, MatchError, ValidationError};
use crate::models::{AnalysisResult, JobMatchResponse, Resume, ResumeDetail, SkillMatch};
use crate::pages::lock;
use crate::state::AppState;

pub const MAX_JD_CHARS: usize = 5000;

const MATCH_FALLBACK_MESSAGE: &str = "Failed to run analysis. Please try again.";

/// Checks a job description before it is sent. Length is counted on the
/// trimmed text, in characters.
pub fn validate_job_description(jd: &str) -> Result<(), ValidationError> {
    let trimmed = jd.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyJobDescription);
    }
    let length = trimmed.chars().count();
    if length > MAX_JD_CHARS {
        return Err(ValidationError::JobDescriptionTooLong {
            length,
            max: MAX_JD_CHARS,
        });
    }
    Ok(())
}

/// A stored match result with its derived matched skills.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub response: JobMatchResponse,
    pub matched_skills: Vec<String>,
}

impl From<JobMatchResponse> for MatchOutcome {
    fn from(response: JobMatchResponse) -> Self {
        if !response.missing_is_subset() {
            warn!(
                jd_skills = ?response.jd_skills,
                missing_skills = ?response.missing_skills,
                "Match response lists missing skills outside the job description skills"
            );
        }
        let matched_skills = response.matched_skills();
        Self {
            response,
            matched_skills,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchStatus {
    Idle,
    Matching,
    Matched(MatchOutcome),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisStatus {
    Idle,
    Analyzing,
    /// Includes soft failures: check `AnalysisResult::is_soft_failure`.
    Analyzed(AnalysisResult),
    Error(String),
}

/// Snapshot of everything the match page renders.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchView {
    pub selected: Option<ResumeDetail>,
    pub job_description: String,
    pub status: MatchStatus,
    pub analysis: AnalysisStatus,
    pub resumes: Vec<Resume>,
    pub loading_resumes: bool,
    pub loading_resume: Option<i64>,
}

impl MatchView {
    /// Mirrors the submit button's enabled state.
    pub fn can_submit(&self) -> bool {
        self.status != MatchStatus::Matching
            && self.selected.is_some()
            && !self.job_description.trim().is_empty()
    }
}

#[derive(Debug)]
struct MatchInner {
    job_description: String,
    status: MatchStatus,
    analysis: AnalysisStatus,
    resumes: Vec<Resume>,
    loading_resumes: bool,
    loading_resume: Option<i64>,
}

/// Resume-versus-job-description page: match flow, coaching sub-flow and
/// the resume picker.
pub struct MatchPage {
    state: AppState,
    inner: Mutex<MatchInner>,
}

impl MatchPage {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            inner: Mutex::new(MatchInner {
                job_description: String::new(),
                status: MatchStatus::Idle,
                analysis: AnalysisStatus::Idle,
                resumes: Vec::new(),
                loading_resumes: true,
                loading_resume: None,
            }),
        }
    }

    /// Loads the picker's resume list.
    pub async fn mount(&self) {
        lock(&self.inner).loading_resumes = true;
        let result = self.state.api.get_resumes().await;
        let mut inner = lock(&self.inner);
        inner.loading_resumes = false;
        match result {
            Ok(resumes) => inner.resumes = resumes,
            Err(err) => {
                drop(inner);
                warn!("Failed to fetch resumes list: {err}");
                self.state.notifier.error("Could not load resume list.");
            }
        }
    }

    pub fn set_job_description(&self, text: impl Into<String>) {
        lock(&self.inner).job_description = text.into();
    }

    pub fn view(&self) -> MatchView {
        let inner = lock(&self.inner);
        MatchView {
            selected: self.state.selection.get(),
            job_description: inner.job_description.clone(),
            status: inner.status.clone(),
            analysis: inner.analysis.clone(),
            resumes: inner.resumes.clone(),
            loading_resumes: inner.loading_resumes,
            loading_resume: inner.loading_resume,
        }
    }

    /// Runs a match for the selected resume and the current job description.
    ///
    /// Submissions are not fenced: when two are in flight, whichever
    /// response arrives last is the one that stays on screen.
    pub async fn submit_match(&self) -> Result<MatchOutcome, MatchError> {
        let (resume_id, jd) = match self.check_match_inputs() {
            Ok(inputs) => inputs,
            Err(err) => {
                self.state.notifier.validation(err.to_string());
                return Err(err.into());
            }
        };

        {
            let mut inner = lock(&self.inner);
            inner.status = MatchStatus::Matching;
            inner.analysis = AnalysisStatus::Idle;
        }

        match self.state.api.create_match(resume_id, &jd).await {
            Ok(response) => {
                let outcome = MatchOutcome::from(response);
                info!(
                    resume_id,
                    score = outcome.response.match_score,
                    matched = outcome.matched_skills.len(),
                    missing = outcome.response.missing_skills.len(),
                    "Match complete"
                );
                lock(&self.inner).status = MatchStatus::Matched(outcome.clone());
                self.state.notifier.success("Analysis complete!");
                Ok(outcome)
            }
            Err(err) => {
                let message = user_message(&err, MATCH_FALLBACK_MESSAGE);
                lock(&self.inner).status = MatchStatus::Error(message.clone());
                self.state.notifier.error(message);
                Err(err.into())
            }
        }
    }

    fn check_match_inputs(&self) -> Result<(i64, String), ValidationError> {
        let resume_id = self
            .state
            .selection
            .id()
            .ok_or(ValidationError::NoResumeSelected)?;
        let jd = lock(&self.inner).job_description.clone();
        validate_job_description(&jd)?;
        Ok((resume_id, jd))
    }

    /// Requests AI coaching for the selected resume, with the job
    /// description when one has been entered. Independent of the match flow.
    pub async fn run_analysis(&self) -> Result<AnalysisResult, MatchError> {
        let Some(resume_id) = self.state.selection.id() else {
            let err = ValidationError::NoResumeSelected;
            self.state.notifier.validation(err.to_string());
            return Err(err.into());
        };

        let jd = {
            let mut inner = lock(&self.inner);
            inner.analysis = AnalysisStatus::Analyzing;
            inner.job_description.clone()
        };
        let jd = (!jd.trim().is_empty()).then_some(jd.as_str());

        match self.state.api.get_analysis(resume_id, jd).await {
            Ok(result) => {
                if result.is_soft_failure() {
                    warn!(
                        resume_id,
                        error = result.error.as_deref().unwrap_or_default(),
                        "Coaching analysis came back degraded"
                    );
                    self.state.notifier.warning(
                        "AI analysis returned with an error. The coaching model may be offline.",
                    );
                } else {
                    self.state.notifier.success("AI coaching complete!");
                }
                lock(&self.inner).analysis = AnalysisStatus::Analyzed(result.clone());
                Ok(result)
            }
            Err(err) => {
                let message = user_message(&err, "AI analysis failed.");
                lock(&self.inner).analysis = AnalysisStatus::Error(message);
                self.state
                    .notifier
                    .error("AI analysis failed. Is the coaching model running?");
                Err(err.into())
            }
        }
    }

    /// Picker callback: loads the resume's detail and makes it the session's selection.
    pub async fn select_resume(&self, id: i64) -> Result<ResumeDetail, MatchError> {
        {
            let mut inner = lock(&self.inner);
            if inner.loading_resume == Some(id) {
                return Err(MatchError::AlreadyLoading(id));
            }
            inner.loading_resume = Some(id);
        }

        let result = self.state.api.get_resume_by_id(id).await;

        {
            let mut inner = lock(&self.inner);
            if inner.loading_resume == Some(id) {
                inner.loading_resume = None;
            }
        }

        match result {
            Ok(detail) => {
                self.state.selection.set(Some(detail.clone()));
                Ok(detail)
            }
            Err(err) => {
                self.state.notifier.error("Failed to load selected resume.");
                Err(err.into())
            }
        }
    }
}
