use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;

/// Anything that carries a job description's skills and the subset the
/// resume lacks. Matched skills are always derived, never stored.
pub trait SkillMatch {
    fn jd_skills(&self) -> &[String];
    fn missing_skills(&self) -> &[String];

    /// `jd_skills - missing_skills`, preserving job-description order.
    fn matched_skills(&self) -> Vec<String> {
        let missing = self.missing_skills();
        self.jd_skills()
            .iter()
            .filter(|skill| !missing.contains(skill))
            .cloned()
            .collect()
    }

    /// Whether every missing skill also appears in the job-description skills.
    fn missing_is_subset(&self) -> bool {
        let jd = self.jd_skills();
        self.missing_skills().iter().all(|skill| jd.contains(skill))
    }
}

/// Response of `POST /resume/match`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMatchResponse {
    pub jd_text: String,
    #[serde(default)]
    pub jd_skills: Vec<String>,
    pub match_score: f64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
}

/// A stored match as listed by `GET /resume/matches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: i64,
    pub jd_text: String,
    #[serde(default)]
    pub jd_skills: Vec<String>,
    pub match_score: f64,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub resume_filename: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A single match with a snapshot of the resume skills it was scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub summary: Match,
    #[serde(default)]
    pub resume_skills: Vec<String>,
}

impl SkillMatch for JobMatchResponse {
    fn jd_skills(&self) -> &[String] {
        &self.jd_skills
    }
    fn missing_skills(&self) -> &[String] {
        &self.missing_skills
    }
}

impl SkillMatch for Match {
    fn jd_skills(&self) -> &[String] {
        &self.jd_skills
    }
    fn missing_skills(&self) -> &[String] {
        &self.missing_skills
    }
}

impl SkillMatch for MatchDetail {
    fn jd_skills(&self) -> &[String] {
        &self.summary.jd_skills
    }
    fn missing_skills(&self) -> &[String] {
        &self.summary.missing_skills
    }
}

/// Coaching feedback from `POST /resume/analyze`.
///
/// `error` set means the upstream model was unavailable; the remaining
/// fields are still rendered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub keywords_to_add: Vec<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub match_percentage: Option<i64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn is_soft_failure(&self) -> bool {
        self.error
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty())
    }
}

/// Aggregate counters for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_resumes: u64,
    pub total_matches: u64,
    pub avg_score: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    Excellent,
    Good,
    NeedsWork,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            ScoreBand::Excellent
        } else if score >= 60.0 {
            ScoreBand::Good
        } else {
            ScoreBand::NeedsWork
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent Match",
            ScoreBand::Good => "Good Fit",
            ScoreBand::NeedsWork => "Needs Work",
        }
    }
}
