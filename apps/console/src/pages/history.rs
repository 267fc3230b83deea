use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::api_client::ApiClient;
use crate::errors::{user_message, ApiError, DeleteError};
use crate::models::{Match, Resume};
use crate::pages::lock;
use crate::state::AppState;

/// A row of a history page: identifiable, searchable, fetchable and deletable.
#[async_trait]
pub trait ListItem: Clone + Send + Sync + 'static {
    /// Nouns used in user-facing messages.
    const NOUN: &'static str;
    const PLURAL: &'static str;

    fn id(&self) -> i64;

    /// `query` is already lower-cased.
    fn matches_query(&self, query: &str) -> bool;

    async fn fetch_all(api: &ApiClient) -> Result<Vec<Self>, ApiError>;

    async fn delete(api: &ApiClient, id: i64) -> Result<(), ApiError>;
}

#[async_trait]
impl ListItem for Resume {
    const NOUN: &'static str = "resume";
    const PLURAL: &'static str = "resumes";

    fn id(&self) -> i64 {
        self.id
    }

    fn matches_query(&self, query: &str) -> bool {
        self.filename.to_lowercase().contains(query)
            || self
                .skills
                .iter()
                .any(|skill| skill.to_lowercase().contains(query))
    }

    async fn fetch_all(api: &ApiClient) -> Result<Vec<Self>, ApiError> {
        api.get_resumes().await
    }

    async fn delete(api: &ApiClient, id: i64) -> Result<(), ApiError> {
        api.delete_resume(id).await.map(|_| ())
    }
}

#[async_trait]
impl ListItem for Match {
    const NOUN: &'static str = "match";
    const PLURAL: &'static str = "matches";

    fn id(&self) -> i64 {
        self.id
    }

    fn matches_query(&self, query: &str) -> bool {
        self.resume_filename
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(query))
            || self.jd_text.to_lowercase().contains(query)
    }

    async fn fetch_all(api: &ApiClient) -> Result<Vec<Self>, ApiError> {
        api.get_matches().await
    }

    async fn delete(api: &ApiClient, id: i64) -> Result<(), ApiError> {
        api.delete_match(id).await.map(|_| ())
    }
}

/// Case-insensitive substring filter. An empty query keeps everything.
pub fn filter_items<T: ListItem>(items: &[T], query: &str) -> Vec<T> {
    let query = query.to_lowercase();
    if query.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| item.matches_query(&query))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListView<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub loading: bool,
    pub search: String,
    pub deleting: Vec<i64>,
    pub error: Option<String>,
}

#[derive(Debug)]
struct ListInner<T> {
    items: Vec<T>,
    loading: bool,
    search: String,
    deleting: HashSet<i64>,
    error: Option<String>,
}

/// Fetch-once list with local search and per-item deletion.
pub struct ListPage<T: ListItem> {
    state: AppState,
    inner: Mutex<ListInner<T>>,
}

pub type ResumeList = ListPage<Resume>;
pub type MatchList = ListPage<Match>;

impl<T: ListItem> ListPage<T> {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            inner: Mutex::new(ListInner {
                items: Vec::new(),
                loading: true,
                search: String::new(),
                deleting: HashSet::new(),
                error: None,
            }),
        }
    }

    pub async fn mount(&self) -> Result<(), ApiError> {
        lock(&self.inner).loading = true;
        let result = T::fetch_all(&self.state.api).await;

        let mut inner = lock(&self.inner);
        inner.loading = false;
        match result {
            Ok(items) => {
                info!(count = items.len(), "Loaded {}", T::PLURAL);
                inner.items = items;
                inner.error = None;
                Ok(())
            }
            Err(err) => {
                let message = format!("Failed to load {}.", T::PLURAL);
                inner.error = Some(message.clone());
                drop(inner);
                warn!("{message} {err}");
                self.state.notifier.error(message);
                Err(err)
            }
        }
    }

    pub fn set_search(&self, query: impl Into<String>) {
        lock(&self.inner).search = query.into();
    }

    /// Items passing the current search.
    pub fn filtered(&self) -> Vec<T> {
        let inner = lock(&self.inner);
        filter_items(&inner.items, &inner.search)
    }

    pub fn items(&self) -> Vec<T> {
        lock(&self.inner).items.clone()
    }

    pub fn is_deleting(&self, id: i64) -> bool {
        lock(&self.inner).deleting.contains(&id)
    }

    pub fn view(&self) -> ListView<T> {
        let inner = lock(&self.inner);
        let mut deleting: Vec<i64> = inner.deleting.iter().copied().collect();
        deleting.sort_unstable();
        ListView {
            items: filter_items(&inner.items, &inner.search),
            total: inner.items.len(),
            loading: inner.loading,
            search: inner.search.clone(),
            deleting,
            error: inner.error.clone(),
        }
    }

    /// Deletes one item. The row leaves the list only after the server
    /// confirms; a failed delete leaves the list as it was.
    pub async fn delete(&self, id: i64) -> Result<(), DeleteError> {
        if !lock(&self.inner).deleting.insert(id) {
            return Err(DeleteError::AlreadyDeleting(id));
        }

        let result = T::delete(&self.state.api, id).await;

        let mut inner = lock(&self.inner);
        inner.deleting.remove(&id);
        match result {
            Ok(()) => {
                inner.items.retain(|item| item.id() != id);
                drop(inner);
                info!(id, "Deleted {}", T::NOUN);
                self.state.notifier.success(format!("{} deleted.", capitalize(T::NOUN)));
                Ok(())
            }
            Err(err) => {
                drop(inner);
                let message = user_message(&err, "Unknown error");
                self.state
                    .notifier
                    .error(format!("Failed to delete {}: {message}", T::NOUN));
                Err(err.into())
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
