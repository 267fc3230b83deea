// Page orchestrators: each owns one page's UI state machine and is driven
// by method calls standing in for user events. All of them catch failures
// at the action boundary and report them through the shared `Notifier`.

pub mod dashboard;
pub mod history;
pub mod match_detail;
pub mod matcher;
pub mod upload;

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Where the shell should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Dashboard,
    Upload,
    Match,
    Matches,
    MatchDetail(i64),
    Resumes,
}

/// A navigation the shell performs once `after` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Navigation,
    pub after: Duration,
}

impl Redirect {
    pub fn now(to: Navigation) -> Self {
        Self {
            to,
            after: Duration::ZERO,
        }
    }
}

// Page state is only touched between awaits, so a poisoned lock still holds
// a consistent snapshot.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
