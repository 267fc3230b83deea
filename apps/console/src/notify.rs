use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NoticeLevel::Success => "ok",
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        f.write_str(label)
    }
}

/// A transient, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    notices: VecDeque<Notice>,
}

/// Toast queue shared by every page. Pushes are mirrored to the log.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    inner: Arc<Mutex<Queue>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, level: NoticeLevel, message: impl Into<String>) -> u64 {
        let message = message.into();
        match level {
            NoticeLevel::Error => error!("{message}"),
            NoticeLevel::Warning => warn!("{message}"),
            NoticeLevel::Success | NoticeLevel::Info => info!("{message}"),
        }
        self.enqueue(level, message)
    }

    /// Inline input feedback. Shown like a warning but only traced at debug.
    pub fn validation(&self, message: impl Into<String>) -> u64 {
        let message = message.into();
        debug!("Validation: {message}");
        self.enqueue(NoticeLevel::Warning, message)
    }

    fn enqueue(&self, level: NoticeLevel, message: String) -> u64 {
        let mut queue = self.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.notices.push_back(Notice { id, level, message });
        id
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, message)
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, message)
    }

    /// Removes one notice; returns whether it was still pending.
    pub fn dismiss(&self, id: u64) -> bool {
        let mut queue = self.lock();
        let before = queue.notices.len();
        queue.notices.retain(|n| n.id != id);
        queue.notices.len() != before
    }

    pub fn pending(&self) -> Vec<Notice> {
        self.lock().notices.iter().cloned().collect()
    }

    pub fn drain(&self) -> Vec<Notice> {
        self.lock().notices.drain(..).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
