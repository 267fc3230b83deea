//! Change notifications pushed by the database's realtime service.
//!
//! A [`ChangeFeed`] hands out [`Subscription`]s. Each subscription is
//! backed by a driver task; the [`SubscriptionHandle`] is the only way to
//! stop it. Call [`SubscriptionHandle::unsubscribe`] on unmount. Dropping
//! the handle signals the driver as well, so a forgotten handle cannot
//! leak a listener.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::RealtimeError;

pub mod phoenix;
pub mod supabase;

pub use supabase::{ReconnectPolicy, SupabaseRealtime};

/// Buffered events per subscription before the driver waits on the consumer.
pub const SUBSCRIPTION_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
    #[serde(rename = "*")]
    All,
}

/// Which row changes a subscription cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub channel: String,
    pub event: ChangeKind,
    pub schema: String,
    pub table: String,
}

impl ChangeFilter {
    pub fn new(
        channel: impl Into<String>,
        event: ChangeKind,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            event,
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// New rows in `public.resumes`, as watched by the dashboard.
    pub fn resume_inserts() -> Self {
        Self::new("dashboard-resumes", ChangeKind::Insert, "public", "resumes")
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        (self.event == ChangeKind::All || self.event == event.kind)
            && self.schema == event.schema
            && self.table == event.table
    }
}

/// One row-level change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub schema: String,
    pub table: String,
    #[serde(default)]
    pub record: Value,
    #[serde(default)]
    pub commit_timestamp: Option<String>,
}

impl ChangeEvent {
    pub fn insert(schema: impl Into<String>, table: impl Into<String>, record: Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            schema: schema.into(),
            table: table.into(),
            record,
            commit_timestamp: None,
        }
    }
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, RealtimeError>;
}

/// Stops a subscription's driver task.
#[derive(Debug)]
pub struct SubscriptionHandle {
    channel: String,
    shutdown: Option<oneshot::Sender<()>>,
    driver: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn is_active(&self) -> bool {
        self.driver.as_ref().is_some_and(|d| !d.is_finished())
    }

    /// Signals the driver and waits for it to leave the channel.
    pub async fn unsubscribe(mut self) {
        debug!(channel = %self.channel, "Unsubscribing");
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(driver) = self.driver.take() {
            if let Err(err) = driver.await {
                warn!(channel = %self.channel, "Realtime driver ended abnormally: {err}");
            }
        }
    }
}

/// Event stream plus the handle that ends it.
#[derive(Debug)]
pub struct Subscription {
    events: mpsc::Receiver<ChangeEvent>,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// Spawns `driver` with a shutdown receiver and an event sender.
    pub fn spawn<F, Fut>(channel: impl Into<String>, driver: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>, mpsc::Sender<ChangeEvent>) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (events_tx, events_rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let driver = tokio::spawn(driver(shutdown_rx, events_tx));
        Self {
            events: events_rx,
            handle: SubscriptionHandle {
                channel: channel.into(),
                shutdown: Some(shutdown_tx),
                driver: Some(driver),
            },
        }
    }

    /// Next event; `None` once the driver has stopped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    pub fn into_parts(self) -> (mpsc::Receiver<ChangeEvent>, SubscriptionHandle) {
        (self.events, self.handle)
    }

    pub async fn unsubscribe(self) {
        self.handle.unsubscribe().await;
    }
}

/// In-process feed: whatever is published reaches every live subscription.
#[derive(Debug, Clone)]
pub struct BroadcastFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for BroadcastFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastFeed {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(SUBSCRIPTION_BUFFER);
        Self { tx }
    }

    /// Returns how many subscriptions are listening.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl ChangeFeed for BroadcastFeed {
    async fn subscribe(&self, filter: ChangeFilter) -> Result<Subscription, RealtimeError> {
        let mut rx = self.tx.subscribe();
        let channel = filter.channel.clone();

        Ok(Subscription::spawn(channel, move |mut shutdown, events| async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown => break,
                    received = rx.recv() => match received {
                        Ok(event) if filter.matches(&event) => {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(channel = %filter.channel, "Change feed lagged by {n} events");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
        }))
    }
}
