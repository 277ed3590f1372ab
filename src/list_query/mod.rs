//! Paginated, filtered list controller
//!
//! A [`ListQuery`] owns the filters and the fetched page for one list screen.
//! Every filter change triggers a fetch in a background task; results are
//! published through a `tokio::sync::watch` channel.
//!
//! Ordering: each fetch carries a generation number and only the newest
//! generation may write state, so a slow older response can never overwrite a
//! newer one. Issuing a fetch also aborts the previous in-flight task.
//! Dropping the controller cancels the pending search timer and the in-flight
//! fetch.
//!
//! All methods that trigger work spawn onto the current tokio runtime.

pub mod fetch;
pub mod state;

pub use fetch::fetch_page;
pub use state::ListState;

use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiError, Transport};
use crate::config::Config;
use crate::models::{FilterPatch, PageMeta, PagedResult, QueryFilters, SEARCH_KEY};
use crate::resources::Resource;
use crate::validation::{FilterSchema, ValidationError};

/// Construction options for a [`ListQuery`]
#[derive(Clone)]
pub struct ListQueryOptions {
    pub debounce: Duration,
    pub page_size: u32,
    pub schema: Option<Arc<dyn FilterSchema>>,
}

impl Default for ListQueryOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            page_size: 10,
            schema: None,
        }
    }
}

impl ListQueryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.search_debounce(),
            page_size: config.list.page_size,
            schema: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_schema(mut self, schema: impl FilterSchema + 'static) -> Self {
        self.schema = Some(Arc::new(schema));
        self
    }
}

struct Inner<T> {
    transport: Arc<dyn Transport>,
    endpoint: String,
    debounce: Duration,
    schema: Option<Arc<dyn FilterSchema>>,
    state: watch::Sender<ListState<T>>,
    generation: AtomicU64,
    in_flight: Mutex<Option<JoinHandle<()>>>,
    debounce_slot: Mutex<Option<JoinHandle<()>>>,
}

/// Controller for one paginated list
pub struct ListQuery<T> {
    inner: Arc<Inner<T>>,
}

impl<T> ListQuery<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Create a controller with default filters. Nothing is fetched until
    /// [`refetch`](Self::refetch) or a filter change.
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        options: ListQueryOptions,
    ) -> Self {
        let filters = QueryFilters::new(options.page_size);
        let (state, _) = watch::channel(ListState::new(filters));

        Self {
            inner: Arc::new(Inner {
                transport,
                endpoint: endpoint.into(),
                debounce: options.debounce,
                schema: options.schema,
                state,
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                debounce_slot: Mutex::new(None),
            }),
        }
    }

    /// Controller for a back-office resource, validated by its filter schema
    pub fn for_resource(
        transport: Arc<dyn Transport>,
        resource: Resource,
        options: ListQueryOptions,
    ) -> Self {
        Self::new(transport, resource.endpoint(), options.with_schema(resource))
    }

    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> ListState<T> {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ListState<T>> {
        self.inner.state.subscribe()
    }

    /// Wait until no fetch is in flight and return the state at that point.
    /// A search still waiting out its debounce is not a fetch yet.
    pub async fn settled(&self) -> ListState<T> {
        let mut receiver = self.inner.state.subscribe();
        let state = match receiver.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        };
        state
    }

    /// Merge `patch` into the filters and fetch if anything changed.
    ///
    /// Returns `Ok(false)` when the patch changes nothing. On a validation
    /// error the filters stay as they were and nothing is sent.
    pub fn set_filters(&self, patch: FilterPatch) -> Result<bool, ValidationError> {
        self.inner.apply(patch)
    }

    /// Debounced search: only the last text within the quiet period is applied
    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let patch = if text.trim().is_empty() {
                FilterPatch::new().clear(SEARCH_KEY)
            } else {
                FilterPatch::new().set(SEARCH_KEY, text)
            };
            if let Err(e) = inner.apply(patch) {
                warn!("Search rejected for {}: {}", inner.endpoint, e);
            }
        });

        replace_task(&self.inner.debounce_slot, handle);
    }

    pub fn go_to_page(&self, page: u32) -> Result<bool, ValidationError> {
        self.inner.apply(FilterPatch::new().page(page))
    }

    /// Move forward one page; does nothing on the last page
    pub fn next_page(&self) -> Result<bool, ValidationError> {
        let pagination = self.inner.state.borrow().pagination;
        if !pagination.has_next() {
            return Ok(false);
        }
        self.go_to_page(pagination.current_page() + 1)
    }

    /// Move back one page; does nothing on the first page
    pub fn prev_page(&self) -> Result<bool, ValidationError> {
        let pagination = self.inner.state.borrow().pagination;
        if !pagination.has_prev() {
            return Ok(false);
        }
        self.go_to_page(pagination.current_page() - 1)
    }

    /// Fetch again with the current filters, e.g. on mount or after a mutation
    pub fn refetch(&self) -> Result<(), ValidationError> {
        self.inner.refetch()
    }

    /// Run a create/update/delete call and refresh the list if it succeeded
    pub async fn after_mutation<F, R>(&self, mutation: F) -> Result<R, ApiError>
    where
        F: Future<Output = Result<R, ApiError>>,
    {
        let outcome = mutation.await?;
        self.refetch()?;
        Ok(outcome)
    }
}

impl<T> Drop for ListQuery<T> {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Merge, validate, commit and fetch as one step under the in-flight lock,
    /// so concurrent patches never overwrite each other.
    fn apply(self: &Arc<Self>, patch: FilterPatch) -> Result<bool, ValidationError> {
        let mut in_flight = lock_slot(&self.in_flight);

        let mut candidate = self.state.borrow().filters.clone();
        if !candidate.merge(patch) {
            debug!("Filters unchanged for {}, skipping fetch", self.endpoint);
            return Ok(false);
        }

        self.validate(&candidate)?;
        self.state.send_modify(|state| state.filters = candidate.clone());
        self.issue_fetch(&mut in_flight, candidate);
        Ok(true)
    }

    fn refetch(self: &Arc<Self>) -> Result<(), ValidationError> {
        let mut in_flight = lock_slot(&self.in_flight);

        let filters = self.state.borrow().filters.clone();
        self.validate(&filters)?;
        self.issue_fetch(&mut in_flight, filters);
        Ok(())
    }

    fn validate(&self, filters: &QueryFilters) -> Result<(), ValidationError> {
        match &self.schema {
            Some(schema) => schema.validate(filters).map_err(|e| {
                warn!("Invalid filters for {}: {}", self.endpoint, e);
                e
            }),
            None => Ok(()),
        }
    }

    /// Start a fetch for `filters`. The caller holds the in-flight slot, so the
    /// task left in the slot is always the one with the newest generation.
    fn issue_fetch(self: &Arc<Self>, in_flight: &mut Option<JoinHandle<()>>, filters: QueryFilters) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.loading = true);
        debug!("Fetching {} (generation {})", self.endpoint, generation);

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome = fetch_page::<T>(inner.transport.as_ref(), &inner.endpoint, &filters).await;
            inner.settle(generation, &filters, outcome);
        });

        if let Some(previous) = in_flight.replace(handle) {
            previous.abort();
        }
    }

    /// Publish a finished fetch unless a newer one has been issued since
    fn settle(&self, generation: u64, filters: &QueryFilters, outcome: Result<PagedResult<T>, ApiError>) {
        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            state.loading = false;
            match outcome {
                Ok(page) => {
                    state.items = page.items;
                    state.pagination = page.meta;
                    state.error = None;
                }
                Err(e) => {
                    warn!("Fetching {} failed: {}", self.endpoint, e);
                    state.items.clear();
                    state.pagination = PageMeta::empty(filters.limit());
                    state.error = Some(e.user_message());
                }
            }
            true
        });

        if !applied {
            debug!(
                "Discarded stale response for {} (generation {})",
                self.endpoint, generation
            );
        }
    }
}

impl<T> Inner<T> {
    fn teardown(&self) {
        cancel_task(&self.debounce_slot);

        let mut in_flight = lock_slot(&self.in_flight);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = in_flight.take() {
            handle.abort();
        }
    }
}

/// Lock a task slot. A slot only holds a handle, so a poisoned one is still usable.
fn lock_slot(slot: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    slot.lock().unwrap_or_else(|poisoned| {
        warn!("Task slot lock was poisoned, recovering");
        poisoned.into_inner()
    })
}

/// Store `handle` in a single-slot task holder, aborting whatever was there
fn replace_task(slot: &Mutex<Option<JoinHandle<()>>>, handle: JoinHandle<()>) {
    if let Some(previous) = lock_slot(slot).replace(handle) {
        previous.abort();
    }
}

fn cancel_task(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = lock_slot(slot).take() {
        handle.abort();
    }
}
