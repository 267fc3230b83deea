use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{ApiError, RealtimeError};
use crate::models::{Resume, Stats};
use crate::pages::lock;
use crate::realtime::{ChangeFeed, ChangeFilter, SubscriptionHandle};
use crate::state::AppState;

/// How many resumes the "recent" panel shows.
pub const RECENT_LIMIT: usize = 5;

pub const LIVE_UPDATES_STOPPED: &str = "Live updates stopped.";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardView {
    pub stats: Option<Stats>,
    pub recent: Vec<Resume>,
    pub loading: bool,
    /// Completed fetches since construction.
    pub fetches: u64,
}

/// Stats plus recent resumes, refreshed whenever a resume is inserted.
pub struct Dashboard {
    state: AppState,
    view: Mutex<DashboardView>,
    fetches: AtomicU64,
}

impl Dashboard {
    pub fn new(state: AppState) -> Arc<Self> {
        Arc::new(Self {
            state,
            view: Mutex::new(DashboardView {
                loading: true,
                ..DashboardView::default()
            }),
            fetches: AtomicU64::new(0),
        })
    }

    pub fn view(&self) -> DashboardView {
        let mut view = lock(&self.view).clone();
        view.fetches = self.fetches.load(Ordering::SeqCst);
        view
    }

    /// Full refetch of stats and recent resumes. A failing resume list
    /// degrades to an empty panel; a failing stats call keeps the old stats.
    pub async fn fetch(&self) -> Result<(), ApiError> {
        let (stats, resumes) = tokio::join!(self.state.api.get_stats(), self.state.api.get_resumes());

        let resumes = resumes.unwrap_or_else(|err| {
            warn!("Failed to fetch recent resumes: {err}");
            Vec::new()
        });

        let result = {
            let mut view = lock(&self.view);
            view.loading = false;
            match stats {
                Ok(stats) => {
                    view.stats = Some(stats);
                    view.recent = resumes.into_iter().take(RECENT_LIMIT).collect();
                    Ok(())
                }
                Err(err) => Err(err),
            }
        };

        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Err(err) = &result {
            error!("Failed to fetch dashboard data: {err}");
        }
        result
    }

    /// Initial fetch, then a full refetch on every resume insert until the
    /// returned handle is unmounted or dropped.
    pub async fn mount(
        self: &Arc<Self>,
        feed: &dyn ChangeFeed,
    ) -> Result<MountedDashboard, RealtimeError> {
        if let Err(err) = self.fetch().await {
            debug!("Dashboard mounted without fresh data: {err}");
        }

        let subscription = feed.subscribe(ChangeFilter::resume_inserts()).await?;
        let (mut events, handle) = subscription.into_parts();

        let dashboard = Arc::clone(self);
        let listener = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!(table = %event.table, "Resume inserted, refreshing dashboard");
                if let Err(err) = dashboard.fetch().await {
                    debug!("Dashboard refresh after insert failed: {err}");
                }
            }
            // Only reached when the feed gives up; unmount aborts this task first.
            dashboard.state.notifier.warning(LIVE_UPDATES_STOPPED);
        });

        info!(channel = handle.channel(), "Dashboard mounted");
        Ok(MountedDashboard {
            listener: Some(listener),
            subscription: Some(handle),
        })
    }
}

/// Live dashboard: owns the realtime subscription and its refetch loop.
#[derive(Debug)]
pub struct MountedDashboard {
    listener: Option<JoinHandle<()>>,
    subscription: Option<SubscriptionHandle>,
}

impl MountedDashboard {
    pub fn is_live(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
    }

    /// Tears the subscription down. Call on navigation away.
    pub async fn unmount(mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe().await;
        }
        info!("Dashboard unmounted");
    }
}

impl Drop for MountedDashboard {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}
