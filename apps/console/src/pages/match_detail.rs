use std::sync::Mutex;

use tracing::info;

use crate::errors::{user_message, ApiError, DeleteError};
use crate::models::{MatchDetail, SkillMatch};
use crate::pages::{lock, Navigation, Redirect};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq)]
pub enum DetailStatus {
    Idle,
    Loading,
    Loaded(MatchDetail),
    Error(String),
}

#[derive(Debug)]
struct DetailInner {
    status: DetailStatus,
    deleting: bool,
}

/// Single stored match, opened from the history list.
pub struct MatchDetailPage {
    state: AppState,
    inner: Mutex<DetailInner>,
}

impl MatchDetailPage {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            inner: Mutex::new(DetailInner {
                status: DetailStatus::Idle,
                deleting: false,
            }),
        }
    }

    pub async fn load(&self, id: i64) -> Result<MatchDetail, ApiError> {
        lock(&self.inner).status = DetailStatus::Loading;
        match self.state.api.get_match_by_id(id).await {
            Ok(detail) => {
                lock(&self.inner).status = DetailStatus::Loaded(detail.clone());
                Ok(detail)
            }
            Err(err) => {
                lock(&self.inner).status =
                    DetailStatus::Error(user_message(&err, "Failed to load match."));
                Err(err)
            }
        }
    }

    pub fn status(&self) -> DetailStatus {
        lock(&self.inner).status.clone()
    }

    pub fn is_deleting(&self) -> bool {
        lock(&self.inner).deleting
    }

    pub fn matched_skills(&self) -> Vec<String> {
        match &lock(&self.inner).status {
            DetailStatus::Loaded(detail) => detail.matched_skills(),
            _ => Vec::new(),
        }
    }

    /// Deletes the loaded match and sends the user back to the history list.
    pub async fn delete(&self) -> Result<Redirect, DeleteError> {
        let id = {
            let mut inner = lock(&self.inner);
            let DetailStatus::Loaded(detail) = &inner.status else {
                return Err(DeleteError::NothingLoaded);
            };
            let id = detail.summary.id;
            if inner.deleting {
                return Err(DeleteError::AlreadyDeleting(id));
            }
            inner.deleting = true;
            id
        };

        let result = self.state.api.delete_match(id).await;
        lock(&self.inner).deleting = false;

        match result {
            Ok(_) => {
                info!(id, "Deleted match");
                lock(&self.inner).status = DetailStatus::Idle;
                self.state.notifier.success("Match deleted.");
                Ok(Redirect::now(Navigation::Matches))
            }
            Err(err) => {
                self.state.notifier.error("Failed to delete match.");
                Err(err.into())
            }
        }
    }
}
