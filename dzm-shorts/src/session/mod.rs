//! Feed Session Controller
//!
//! Owns the feed session state (loaded listings, active index, category
//! filter) and is its only writer. Navigation and filter intents run
//! synchronously on the caller's task; catalog requests run as spawned tasks
//! whose results come back through `next_update`, which applies them one at
//! a time in arrival order.
//!
//! Results are applied only if they still belong to the current feed:
//! a load started under category A that finishes after the viewer switched
//! to B is dropped.
//!
//! Fetch failures never escape: they become `FetchFailed` events and the
//! feed stays on its last good state.

mod fetch;

use crate::catalog::{CatalogService, FeedPage};
use crate::engagement::EngagementTracker;
use crate::error::FetchError;
use crate::playback::{MediaSurface, PlaybackCoordinator};
use crate::reporter::ViewReporter;
use crate::store::{fetch_categories_soft, FeedStore};
use dzm_common::config::ClientSettings;
use dzm_common::events::{EventBus, FeedEvent, FetchKind, PlaybackState};
use dzm_common::time::now;
use dzm_common::{Category, FeedItem};
use fetch::{FetchOutcome, RequestTag};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Listings requested per page
    pub page_size: u32,
    /// Events buffered per subscriber
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            event_capacity: 256,
        }
    }
}

impl SessionOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            page_size: settings.page_size,
            ..Self::default()
        }
    }
}

/// What the view should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedStatus {
    /// `start` has not been called
    Idle,
    /// First page for the current filter is on its way
    Loading,
    /// At least one listing is loaded
    Ready,
    /// The current filter has no listings; show the "no content" view
    Empty,
    /// The load failed and there is nothing to show; `reload` may retry
    Failed,
    /// The session was torn down
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    NotStarted,
    Loading,
    Loaded,
    Failed,
}

/// Result of a navigation intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// The active index changed
    Moved { index: usize },
    /// At the last listing; a page request is outstanding
    FetchingMore,
    /// At the first listing; nothing before it
    AtStart,
    /// No listings loaded, or the session is closed
    Unavailable,
}

/// Effect of one applied catalog response
#[derive(Debug, Clone, PartialEq)]
pub enum SessionUpdate {
    /// A fresh feed replaced the loaded one
    Loaded { items: usize },
    /// A fresh feed came back with no listings
    Empty,
    /// A page was appended; `moved_to` is set when the viewer was carried
    /// onto the first new listing
    Appended { added: usize, moved_to: Option<usize> },
    /// An append came back empty
    EndOfFeed,
    FetchFailed { kind: FetchKind, error: FetchError },
    CategoriesLoaded { count: usize },
    /// The response belonged to a superseded request and was dropped
    Stale,
}

/// One viewer's pass through the shorts feed
pub struct FeedSession {
    id: Uuid,
    store: FeedStore,
    tracker: EngagementTracker,
    playback: PlaybackCoordinator,
    reporter: ViewReporter,
    events: EventBus,

    /// Index into the loaded listings; 0 while the feed is empty
    active_index: usize,
    selected_category: Option<String>,
    categories: Vec<Category>,
    load_state: LoadState,

    generation: u64,
    next_request_id: u64,
    /// Newest category request; older answers are ignored
    latest_categories_request: u64,
    /// Index the viewer was on when the outstanding append was issued
    append_pending: Option<usize>,
    in_flight: HashMap<u64, AbortHandle>,
    outcome_tx: mpsc::UnboundedSender<FetchOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<FetchOutcome>,

    closed: bool,
}

impl FeedSession {
    /// Create a session; must be called inside a tokio runtime
    pub fn new(catalog: Arc<dyn CatalogService>, options: SessionOptions) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let reporter = ViewReporter::spawn(Arc::clone(&catalog));

        Self {
            id: Uuid::new_v4(),
            store: FeedStore::new(catalog, options.page_size),
            tracker: EngagementTracker::new(),
            playback: PlaybackCoordinator::new(),
            reporter,
            events: EventBus::new(options.event_capacity),
            active_index: 0,
            selected_category: None,
            categories: Vec::new(),
            load_state: LoadState::NotStarted,
            generation: 0,
            next_request_id: 0,
            latest_categories_request: 0,
            append_pending: None,
            in_flight: HashMap::new(),
            outcome_tx,
            outcome_rx,
            closed: false,
        }
    }

    // ========================================
    // Intents
    // ========================================

    /// Request the first page for the selected category and the category list
    pub fn start(&mut self) {
        if self.closed {
            return;
        }
        info!(session_id = %self.id, category = ?self.selected_category, "Starting feed session");
        self.issue_load();
        self.issue_categories();
    }

    /// Move to the next listing, requesting another page at the end
    pub fn advance(&mut self) -> Navigation {
        if self.closed || self.store.is_empty() {
            return Navigation::Unavailable;
        }

        let next = self.active_index + 1;
        if next < self.store.len() {
            self.activate(next);
            return Navigation::Moved { index: next };
        }

        if self.append_pending.is_some() || self.load_state == LoadState::Loading {
            return Navigation::FetchingMore;
        }

        // The server's hasMore is only a hint; an empty page ends the feed
        self.issue_append();
        Navigation::FetchingMore
    }

    /// Move to the previous listing; never wraps, never fetches
    pub fn retreat(&mut self) -> Navigation {
        if self.closed || self.store.is_empty() {
            return Navigation::Unavailable;
        }
        if self.active_index == 0 {
            return Navigation::AtStart;
        }

        let previous = self.active_index - 1;
        self.activate(previous);
        Navigation::Moved { index: previous }
    }

    /// Switch the category filter and reload from scratch
    ///
    /// The loaded feed is discarded immediately; responses to requests made
    /// under the old filter are dropped when they arrive.
    pub fn set_category(&mut self, category: Option<String>) {
        if self.closed {
            return;
        }
        info!(
            session_id = %self.id,
            from = ?self.selected_category,
            to = ?category,
            "Changing category filter"
        );

        self.leave_current();
        self.selected_category = category.clone();
        self.store.reset(category);
        self.active_index = 0;
        self.issue_load();
        self.issue_categories();
    }

    /// Select `name`, or clear the filter if `name` is already selected
    pub fn toggle_category(&mut self, name: &str) {
        if self.selected_category.as_deref() == Some(name) {
            self.set_category(None);
        } else {
            self.set_category(Some(name.to_string()));
        }
    }

    /// Fetch the first page again for the current filter
    ///
    /// The loaded feed stays visible until the new one arrives, and stays
    /// if the request fails.
    pub fn reload(&mut self) {
        if self.closed {
            return;
        }
        self.issue_load();
    }

    /// Flip the viewer's like on a loaded listing; returns the new state
    pub fn toggle_like(&mut self, item_id: &str) -> Option<bool> {
        if self.closed {
            return None;
        }
        let item = self.store.find(item_id)?;
        let liked = self.tracker.toggle_like(item_id, item.viewer_has_liked);
        let display_count = self.tracker.display_like_count(item);

        debug!(item_id = %item_id, liked, display_count, "Like toggled");
        self.events.emit_lossy(FeedEvent::LikeToggled {
            session_id: self.id,
            item_id: item_id.to_string(),
            liked,
            display_count,
            timestamp: now(),
        });
        Some(liked)
    }

    /// Tap-to-pause/resume on the active listing's video
    pub fn toggle_playback(&mut self) -> Option<PlaybackState> {
        if self.closed {
            return None;
        }
        let state = self.playback.toggle_active()?;
        if let Some(item) = self.store.get(self.active_index) {
            self.events.emit_lossy(FeedEvent::PlaybackChanged {
                session_id: self.id,
                item_id: item.id.clone(),
                state,
                timestamp: now(),
            });
        }
        Some(state)
    }

    /// Register a media surface the render layer mounted for a listing
    pub fn mount_surface(&mut self, item_id: &str, surface: Arc<dyn MediaSurface>) {
        if self.closed {
            return;
        }
        self.playback.mount(item_id, surface);
    }

    pub fn unmount_surface(&mut self, item_id: &str) {
        self.playback.unmount(item_id);
    }

    /// Unmount every surface whose listing is no longer loaded
    ///
    /// Called by the render layer after the feed was replaced. Returns the
    /// ids that were unmounted.
    pub fn unmount_unloaded(&mut self) -> Vec<String> {
        let store = &self.store;
        let unloaded: Vec<String> = self
            .playback
            .mounted_ids()
            .filter(|id| store.find(id).is_none())
            .map(str::to_string)
            .collect();

        for item_id in &unloaded {
            if let Some(surface) = self.playback.unmount(item_id) {
                surface.pause();
            }
        }
        if !unloaded.is_empty() {
            debug!(session_id = %self.id, count = unloaded.len(), "Unmounted surfaces of unloaded listings");
        }
        unloaded
    }

    /// Leave the feed
    ///
    /// Flushes the open watch interval, pauses every surface and abandons
    /// outstanding requests. Every later intent is a no-op.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        for (_, handle) in self.in_flight.drain() {
            handle.abort();
        }
        self.append_pending = None;
        self.leave_current();

        info!(session_id = %self.id, "Feed session closed");
    }

    /// Tear down and wait until queued view reports are delivered
    pub async fn close(mut self) {
        self.teardown();
        self.reporter.shutdown().await;
    }

    // ========================================
    // Async results
    // ========================================

    /// Whether any catalog request is still outstanding
    pub fn has_pending(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Wait for the next catalog response and apply it
    ///
    /// Returns None when nothing is outstanding or the session is closed.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        if self.closed || self.in_flight.is_empty() {
            return None;
        }
        let outcome = self.outcome_rx.recv().await?;
        Some(self.apply(outcome))
    }

    /// Apply responses until nothing is outstanding
    pub async fn settle(&mut self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.next_update().await {
            updates.push(update);
        }
        updates
    }

    fn apply(&mut self, outcome: FetchOutcome) -> SessionUpdate {
        self.in_flight.remove(&outcome.request_id());
        if self.closed {
            return SessionUpdate::Stale;
        }

        match outcome {
            FetchOutcome::Load { tag, result } => {
                if !self.is_current(&tag) {
                    debug!(request_id = tag.request_id, category = ?tag.category, "Dropping stale feed load");
                    return SessionUpdate::Stale;
                }
                match result {
                    Ok(page) => self.apply_load(tag.category, page),
                    Err(error) => {
                        self.load_state = LoadState::Failed;
                        self.fetch_failed(FetchKind::Load, error)
                    }
                }
            }
            FetchOutcome::Append { tag, result } => {
                if !self.is_current(&tag) {
                    debug!(request_id = tag.request_id, category = ?tag.category, "Dropping stale page append");
                    return SessionUpdate::Stale;
                }
                let boundary = self.append_pending.take();
                match result {
                    Ok(page) => self.apply_append(boundary, page),
                    Err(error) => self.fetch_failed(FetchKind::Append, error),
                }
            }
            FetchOutcome::Categories {
                request_id,
                categories,
            } => {
                if request_id != self.latest_categories_request {
                    return SessionUpdate::Stale;
                }
                let count = categories.len();
                self.categories = categories;
                self.events.emit_lossy(FeedEvent::CategoriesLoaded {
                    session_id: self.id,
                    count,
                    timestamp: now(),
                });
                SessionUpdate::CategoriesLoaded { count }
            }
        }
    }

    fn apply_load(&mut self, category: Option<String>, page: FeedPage) -> SessionUpdate {
        self.load_state = LoadState::Loaded;
        self.store.commit_load(category.clone(), page);
        self.active_index = 0;

        let items = self.store.len();
        info!(session_id = %self.id, category = ?category, items, "Feed loaded");
        self.events.emit_lossy(FeedEvent::FeedLoaded {
            session_id: self.id,
            category: category.clone(),
            item_count: items,
            timestamp: now(),
        });

        if items == 0 {
            self.leave_current();
            self.events.emit_lossy(FeedEvent::FeedEmpty {
                session_id: self.id,
                category,
                timestamp: now(),
            });
            return SessionUpdate::Empty;
        }

        self.activate(0);
        SessionUpdate::Loaded { items }
    }

    fn apply_append(&mut self, boundary: Option<usize>, page: FeedPage) -> SessionUpdate {
        let added = self.store.commit_append(page);
        if added == 0 {
            self.emit_end_of_feed();
            return SessionUpdate::EndOfFeed;
        }

        self.events.emit_lossy(FeedEvent::PageAppended {
            session_id: self.id,
            added,
            total: self.store.len(),
            timestamp: now(),
        });

        // Only carry the viewer forward if they are still waiting at the end
        let moved_to = match boundary {
            Some(index) if index == self.active_index => {
                self.activate(index + 1);
                Some(index + 1)
            }
            _ => None,
        };

        SessionUpdate::Appended { added, moved_to }
    }

    fn fetch_failed(&mut self, kind: FetchKind, error: FetchError) -> SessionUpdate {
        warn!(session_id = %self.id, kind = ?kind, error = %error, "Feed fetch failed");
        self.events.emit_lossy(FeedEvent::FetchFailed {
            session_id: self.id,
            kind,
            reason: error.to_string(),
            timestamp: now(),
        });
        SessionUpdate::FetchFailed { kind, error }
    }

    // ========================================
    // Reads
    // ========================================

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The active listing; None when nothing is loaded
    pub fn current_item(&self) -> Option<&FeedItem> {
        if self.closed {
            return None;
        }
        self.store.get(self.active_index)
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn items(&self) -> &[FeedItem] {
        self.store.items()
    }

    /// "n / total" readout, 1-based; None when nothing is loaded
    pub fn position(&self) -> Option<(usize, usize)> {
        self.current_item()
            .map(|_| (self.active_index + 1, self.store.len()))
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected_category.as_deref()
    }

    /// Categories for the filter menu; empty when unavailable
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn status(&self) -> FeedStatus {
        if self.closed {
            return FeedStatus::Closed;
        }
        if !self.store.is_empty() {
            return FeedStatus::Ready;
        }
        match self.load_state {
            LoadState::NotStarted => FeedStatus::Idle,
            LoadState::Loading => FeedStatus::Loading,
            LoadState::Loaded => FeedStatus::Empty,
            LoadState::Failed => FeedStatus::Failed,
        }
    }

    pub fn is_liked(&self, item_id: &str) -> bool {
        self.store
            .find(item_id)
            .map(|item| self.tracker.is_liked(item))
            .unwrap_or(false)
    }

    /// Like count to display for a loaded listing
    pub fn display_like_count(&self, item_id: &str) -> Option<u64> {
        self.store
            .find(item_id)
            .map(|item| self.tracker.display_like_count(item))
    }

    /// Listing whose dwell time is being measured
    pub fn watching(&self) -> Option<&str> {
        self.tracker.watching()
    }

    pub fn playback(&self) -> &PlaybackCoordinator {
        &self.playback
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    // ========================================
    // Internals
    // ========================================

    /// Make `index` the active listing: flush the old interval, open the
    /// new one, hand playback over
    fn activate(&mut self, index: usize) {
        let Some(item) = self.store.get(index) else {
            return;
        };
        self.active_index = index;

        if let Some(event) = self.tracker.activate(&item.id, Instant::now()) {
            self.reporter.report(event);
        }
        self.playback.set_active(Some(item));

        debug!(session_id = %self.id, item_id = %item.id, index, "Listing activated");
        self.events.emit_lossy(FeedEvent::ItemActivated {
            session_id: self.id,
            item_id: item.id.clone(),
            index,
            total: self.store.len(),
            timestamp: now(),
        });
    }

    /// Close the open watch interval and stop all playback
    fn leave_current(&mut self) {
        if let Some(event) = self.tracker.stop(Instant::now()) {
            self.reporter.report(event);
        }
        self.playback.set_active(None);
    }

    fn emit_end_of_feed(&self) {
        debug!(session_id = %self.id, "End of feed");
        self.events.emit_lossy(FeedEvent::EndOfFeed {
            session_id: self.id,
            timestamp: now(),
        });
    }

    fn is_current(&self, tag: &RequestTag) -> bool {
        tag.generation == self.generation && tag.category == self.selected_category
    }

    fn next_tag(&mut self) -> RequestTag {
        self.next_request_id += 1;
        RequestTag {
            request_id: self.next_request_id,
            generation: self.generation,
            category: self.selected_category.clone(),
        }
    }

    fn issue_load(&mut self) {
        self.generation += 1;
        self.load_state = LoadState::Loading;
        self.append_pending = None;

        let tag = self.next_tag();
        let query = self.store.load_query(self.selected_category.as_deref());
        let catalog = self.store.catalog();
        debug!(request_id = tag.request_id, generation = tag.generation, category = ?tag.category, "Requesting feed");

        let request_id = tag.request_id;
        self.spawn_fetch(request_id, async move {
            let result = catalog.fetch_feed(&query).await;
            FetchOutcome::Load { tag, result }
        });
    }

    fn issue_append(&mut self) {
        self.append_pending = Some(self.active_index);

        let tag = self.next_tag();
        let query = self.store.next_page_query();
        let catalog = self.store.catalog();
        debug!(request_id = tag.request_id, page = query.page, category = ?tag.category, "Requesting next page");

        let request_id = tag.request_id;
        self.spawn_fetch(request_id, async move {
            let result = catalog.fetch_feed(&query).await;
            FetchOutcome::Append { tag, result }
        });
    }

    fn issue_categories(&mut self) {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.latest_categories_request = request_id;
        let catalog = self.store.catalog();

        self.spawn_fetch(request_id, async move {
            let categories = fetch_categories_soft(catalog.as_ref()).await;
            FetchOutcome::Categories {
                request_id,
                categories,
            }
        });
    }

    fn spawn_fetch<F>(&mut self, request_id: u64, request: F)
    where
        F: Future<Output = FetchOutcome> + Send + 'static,
    {
        let tx = self.outcome_tx.clone();
        let handle = tokio::spawn(async move {
            // The session may be gone by now; nothing to apply then
            let _ = tx.send(request.await);
        });
        self.in_flight.insert(request_id, handle.abort_handle());
    }
}

impl Drop for FeedSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
