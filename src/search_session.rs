// Search session: paginated fetching, accumulated ride list, filters and the derived view

use anyhow::{Context, Result};
use cached::{Cached, TimedSizedCache};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::blassa_api::RideSearchApi;
use crate::config::Settings;
use crate::filters::{self, SearchFilters};
use crate::models::{PageMetadata, Ride, SearchParams};

const SEARCH_ERROR_MESSAGE: &str = "Erreur lors de la recherche";

/// Where the next "load more" starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub is_last_page: bool,
}

impl PageCursor {
    fn reset(&mut self) {
        *self = PageCursor::default();
    }

    // The page index only moves once a page has been merged
    fn advance(&mut self, page: &PageMetadata, page_was_empty: bool) {
        self.is_last_page = page_was_empty || page.number.saturating_add(1) >= page.total_pages;
        if !self.is_last_page {
            self.page += 1;
        }
    }
}

/// Appends `incoming` to `existing`, dropping any id already seen. The first
/// occurrence of an id wins, also within a single page.
pub fn merge_unique(existing: &[Ride], incoming: Vec<Ride>) -> Vec<Ride> {
    let mut seen: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();
    let mut merged = existing.to_vec();
    merged.extend(incoming.into_iter().filter(|ride| seen.insert(ride.id.clone())));
    merged
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded,
    // A fetch was already running, the last page was reached or no search was started
    Skipped,
    Failed,
    // The session moved on to another search while this page was in flight
    Stale,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUiState {
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
    pub search_params: Option<SearchParams>,
    pub filters: SearchFilters,
    pub active_filters_count: usize,
    pub current_page: u32,
    pub is_last_page: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchView {
    #[serde(flatten)]
    pub state: SearchUiState,
    pub total_rides: usize,
    pub rides: Arc<Vec<Ride>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    rides_version: u64,
    filters: SearchFilters,
}

#[derive(Default)]
struct SessionState {
    params: Option<SearchParams>,
    rides: Arc<Vec<Ride>>,
    // Bumped whenever `rides` is replaced; identifies the list in the view cache
    rides_version: u64,
    filters: SearchFilters,
    cursor: PageCursor,
    is_loading: bool,
    is_loading_more: bool,
    error: Option<String>,
    generation: u64,
}

impl SessionState {
    fn set_rides(&mut self, rides: Vec<Ride>) {
        self.rides = Arc::new(rides);
        self.rides_version += 1;
    }

    fn ui_state(&self) -> SearchUiState {
        SearchUiState {
            is_loading: self.is_loading,
            is_loading_more: self.is_loading_more,
            error: self.error.clone(),
            search_params: self.params.clone(),
            filters: self.filters.clone(),
            active_filters_count: self.filters.active_filters_count(),
            current_page: self.cursor.page,
            is_last_page: self.cursor.is_last_page,
        }
    }
}

/// One search at a time. State changes happen under `state` and the lock is
/// never held across a backend call.
pub struct SearchSession {
    api: Arc<dyn RideSearchApi>,
    page_size: u32,
    state: RwLock<SessionState>,
    views: Mutex<TimedSizedCache<ViewKey, Arc<Vec<Ride>>>>,
}

impl SearchSession {
    pub fn new(api: Arc<dyn RideSearchApi>, settings: &Settings) -> Self {
        Self {
            api,
            page_size: settings.page_size,
            state: RwLock::new(SessionState::default()),
            views: Mutex::new(TimedSizedCache::with_size_and_lifespan(
                settings.view_cache_capacity,
                settings.view_cache_ttl_secs,
            )),
        }
    }

    /// Starts a new search from page 0. Any page still in flight for a
    /// previous search will be discarded when it lands.
    pub async fn start(self: &Arc<Self>, params: SearchParams) -> Result<LoadOutcome> {
        let generation = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.params = Some(params.clone());
            state.cursor.reset();
            state.set_rides(Vec::new());
            state.is_loading = true;
            state.is_loading_more = false;
            state.error = None;
            state.generation
        };
        tracing::info!(generation, from = %params.from, to = %params.to, "Starting ride search");
        self.spawn_fetch(generation, params, 0, true).await
    }

    /// Restarts the current search from page 0. `None` when nothing was searched yet.
    pub async fn retry(self: &Arc<Self>) -> Result<Option<LoadOutcome>> {
        let params = self.state.read().await.params.clone();
        match params {
            Some(params) => self.start(params).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn load_more(self: &Arc<Self>) -> Result<LoadOutcome> {
        let (generation, params, page) = {
            let mut state = self.state.write().await;
            if state.is_loading || state.is_loading_more || state.cursor.is_last_page {
                return Ok(LoadOutcome::Skipped);
            }
            let Some(params) = state.params.clone() else {
                return Ok(LoadOutcome::Skipped);
            };
            state.is_loading_more = true;
            (state.generation, params, state.cursor.page)
        };
        tracing::debug!(generation, page, "Loading more rides");
        self.spawn_fetch(generation, params, page, false).await
    }

    // Runs detached so a dropped request cannot leave a loading flag set
    async fn spawn_fetch(
        self: &Arc<Self>,
        generation: u64,
        params: SearchParams,
        page: u32,
        first_page: bool,
    ) -> Result<LoadOutcome> {
        let session = Arc::clone(self);
        tokio::spawn(async move { session.fetch_page(generation, params, page, first_page).await })
            .await
            .context("Ride search task panicked")
    }

    async fn fetch_page(&self, generation: u64, params: SearchParams, page: u32, first_page: bool) -> LoadOutcome {
        let result = self.api.search_rides(&params, page, self.page_size).await;

        let mut state = self.state.write().await;
        if state.generation != generation {
            tracing::debug!(
                generation,
                current = state.generation,
                page,
                "Discarding ride page from an abandoned search"
            );
            return LoadOutcome::Stale;
        }

        let outcome = match result {
            Ok(response) => {
                let page_was_empty = response.content.is_empty();
                let merged = if first_page {
                    merge_unique(&[], response.content)
                } else {
                    merge_unique(&state.rides, response.content)
                };
                state.cursor.advance(&response.page, page_was_empty);
                state.set_rides(merged);
                tracing::info!(
                    generation,
                    page,
                    total = state.rides.len(),
                    is_last_page = state.cursor.is_last_page,
                    "Ride page merged"
                );
                LoadOutcome::Loaded
            }
            Err(e) if first_page => {
                tracing::error!(generation, error = ?e, "Ride search failed");
                state.error = Some(SEARCH_ERROR_MESSAGE.to_string());
                LoadOutcome::Failed
            }
            Err(e) => {
                // Existing results stay; the same page is requested next time
                tracing::warn!(generation, page, error = ?e, "Loading more rides failed");
                LoadOutcome::Failed
            }
        };

        if first_page {
            state.is_loading = false;
        } else {
            state.is_loading_more = false;
        }
        outcome
    }

    pub async fn set_filters(&self, filters: SearchFilters) {
        let mut state = self.state.write().await;
        tracing::debug!(active = filters.active_filters_count(), "Updating search filters");
        state.filters = filters;
    }

    pub async fn reset_filters(&self) {
        self.set_filters(SearchFilters::default()).await;
    }

    /// Current state plus the filtered list. The filtered list is computed once
    /// per (ride list, filters) pair and evicted shortly after its last use.
    pub async fn view(&self) -> SearchView {
        let (key, rides, ui_state) = {
            let state = self.state.read().await;
            let key = ViewKey {
                rides_version: state.rides_version,
                filters: state.filters.clone(),
            };
            (key, Arc::clone(&state.rides), state.ui_state())
        };

        let filtered = {
            let mut views = self.views.lock().await;
            match views.cache_get(&key).cloned() {
                Some(view) => view,
                None => {
                    let view = Arc::new(filters::apply(&rides, &key.filters));
                    views.cache_set(key, Arc::clone(&view));
                    view
                }
            }
        };

        SearchView {
            state: ui_state,
            total_rides: rides.len(),
            rides: filtered,
        }
    }
}
