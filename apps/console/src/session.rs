use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::models::ResumeDetail;

/// The session's "currently selected resume".
///
/// Owned by the application shell and handed to each page. Clones share
/// the same slot. `set` is the only mutation path; readers must handle the
/// empty state.
#[derive(Debug, Clone)]
pub struct ResumeSelection {
    tx: Arc<watch::Sender<Option<ResumeDetail>>>,
}

impl Default for ResumeSelection {
    fn default() -> Self {
        Self::new()
    }
}

impl ResumeSelection {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> Option<ResumeDetail> {
        self.tx.borrow().clone()
    }

    pub fn id(&self) -> Option<i64> {
        self.tx.borrow().as_ref().map(|r| r.id)
    }

    pub fn is_selected(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn set(&self, resume: Option<ResumeDetail>) {
        debug!(
            resume_id = resume.as_ref().map(|r| r.id),
            "Updating selected resume"
        );
        self.tx.send_replace(resume);
    }

    /// Receiver that observes every subsequent `set`.
    pub fn watch(&self) -> watch::Receiver<Option<ResumeDetail>> {
        self.tx.subscribe()
    }
}
