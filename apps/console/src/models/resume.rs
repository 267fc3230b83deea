use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;

/// A parsed resume as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Full resume record, fetched only once a specific resume is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeDetail {
    pub id: i64,
    pub filename: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub education: Vec<String>,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub embeddings: Vec<f32>,
    #[serde(default, deserialize_with = "timestamp::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ResumeDetail {
    /// First `n` skills plus how many were left out, as the picker preview shows them.
    pub fn skill_preview(&self, n: usize) -> (&[String], usize) {
        let shown = n.min(self.skills.len());
        (&self.skills[..shown], self.skills.len() - shown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_defaults_missing_text_and_embeddings() {
        let detail: ResumeDetail = serde_json::from_value(serde_json::json!({
            "id": 7,
            "filename": "cv.pdf",
            "skills": ["rust", "sql"]
        }))
        .unwrap();
        assert_eq!(detail.text, "");
        assert!(detail.embeddings.is_empty());
        assert!(detail.created_at.is_none());
    }

    #[test]
    fn test_skill_preview_counts_hidden() {
        let detail = ResumeDetail {
            id: 1,
            filename: "x.pdf".into(),
            text: String::new(),
            skills: ["a", "b", "c", "d", "e", "f"].iter().map(|s| s.to_string()).collect(),
            education: vec![],
            experience: vec![],
            embeddings: vec![],
            created_at: None,
        };
        let (shown, hidden) = detail.skill_preview(4);
        assert_eq!(shown.len(), 4);
        assert_eq!(hidden, 2);
    }
}
