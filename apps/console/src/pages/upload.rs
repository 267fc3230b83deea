use std::sync::Mutex;
use std::time::Duration;

use tracing::info;

use crate::errors::{user_message, UploadError, ValidationError};
use crate::files::{FileCandidate, UPLOAD_PAGE_MAX_BYTES};
use crate::models::ResumeDetail;
use crate::pages::{lock, Navigation, Redirect};
use crate::state::AppState;

/// Pause between a successful upload and moving on to the match page.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1500);
pub const UPLOAD_FALLBACK_MESSAGE: &str = "Failed to upload resume. Please try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Success(ResumeDetail),
    Error(String),
}

#[derive(Debug)]
struct UploadInner {
    file: Option<FileCandidate>,
    status: UploadStatus,
}

/// Two-step upload: pick a file, then confirm.
pub struct UploadPage {
    state: AppState,
    inner: Mutex<UploadInner>,
}

impl UploadPage {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            inner: Mutex::new(UploadInner {
                file: None,
                status: UploadStatus::Idle,
            }),
        }
    }

    /// Drop-target callback. Stores the file without uploading it.
    pub fn accept_file(&self, file: FileCandidate) -> Result<(), UploadError> {
        if let Err(err) = file.validate(UPLOAD_PAGE_MAX_BYTES) {
            self.state.notifier.validation(err.to_string());
            return Err(err.into());
        }

        let mut inner = lock(&self.inner);
        if inner.status == UploadStatus::Uploading {
            return Err(UploadError::AlreadyUploading);
        }
        info!(filename = file.filename(), size = file.size(), "Resume file selected");
        inner.file = Some(file);
        inner.status = UploadStatus::Idle;
        Ok(())
    }

    pub fn clear_file(&self) {
        let mut inner = lock(&self.inner);
        if inner.status != UploadStatus::Uploading {
            inner.file = None;
            inner.status = UploadStatus::Idle;
        }
    }

    pub fn selected_file(&self) -> Option<FileCandidate> {
        lock(&self.inner).file.clone()
    }

    pub fn status(&self) -> UploadStatus {
        lock(&self.inner).status.clone()
    }

    pub fn is_uploading(&self) -> bool {
        lock(&self.inner).status == UploadStatus::Uploading
    }

    /// Uploads the selected file. On success the new resume becomes the
    /// session's selection and the caller is told to move to the match page.
    pub async fn confirm(&self) -> Result<Redirect, UploadError> {
        let file = {
            let mut inner = lock(&self.inner);
            if inner.status == UploadStatus::Uploading {
                return Err(UploadError::AlreadyUploading);
            }
            let Some(file) = inner.file.clone() else {
                drop(inner);
                let err = ValidationError::NoFileSelected;
                self.state.notifier.validation(err.to_string());
                return Err(err.into());
            };
            inner.status = UploadStatus::Uploading;
            file
        };

        match self.state.api.upload_resume(&file).await {
            Ok(resume) => {
                info!(resume_id = resume.id, filename = %resume.filename, "Resume uploaded");
                self.state.selection.set(Some(resume.clone()));
                lock(&self.inner).status = UploadStatus::Success(resume);
                self.state.notifier.success("Resume uploaded. Redirecting to match page...");
                Ok(Redirect {
                    to: Navigation::Match,
                    after: REDIRECT_DELAY,
                })
            }
            Err(err) => {
                let message = user_message(&err, UPLOAD_FALLBACK_MESSAGE);
                lock(&self.inner).status = UploadStatus::Error(message.clone());
                self.state.notifier.error(message);
                Err(err.into())
            }
        }
    }
}
