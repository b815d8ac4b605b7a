//! Test helper modules for dzm-shorts integration tests
//!
//! Provides reusable test infrastructure components:
//! - FakeCatalog: scripted in-memory CatalogService with held responses
//! - RecordingSurface: MediaSurface that counts play commands
//! - Listing builders

#![allow(dead_code)]

use async_trait::async_trait;
use dzm_common::{Category, FeedItem, SellerRef, ViewEvent};
use dzm_shorts::{CatalogService, FeedPage, FeedQuery, FetchError, MediaSurface, TrackingFlushError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

struct Scripted {
    result: Result<FeedPage, FetchError>,
    gate: Option<oneshot::Receiver<()>>,
}

/// In-memory catalog answering feed requests per (category, page)
///
/// Unscripted pages answer with an empty page. A held response is not
/// returned until its gate is released (or dropped).
#[derive(Default)]
pub struct FakeCatalog {
    feeds: Mutex<HashMap<(Option<String>, u32), VecDeque<Scripted>>>,
    queries: Mutex<Vec<FeedQuery>>,
    views: Mutex<Vec<ViewEvent>>,
    categories: Mutex<Option<Result<Vec<Category>, FetchError>>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for one page of one category
    pub fn respond(&self, category: Option<&str>, page: u32, result: Result<FeedPage, FetchError>) {
        self.push(category, page, result, None);
    }

    /// Queue a response that waits for the returned gate
    pub fn respond_held(
        &self,
        category: Option<&str>,
        page: u32,
        result: Result<FeedPage, FetchError>,
    ) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(category, page, result, Some(rx));
        tx
    }

    pub fn set_categories(&self, result: Result<Vec<Category>, FetchError>) {
        *self.categories.lock().unwrap() = Some(result);
    }

    pub fn queries(&self) -> Vec<FeedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn views(&self) -> Vec<ViewEvent> {
        self.views.lock().unwrap().clone()
    }

    fn push(
        &self,
        category: Option<&str>,
        page: u32,
        result: Result<FeedPage, FetchError>,
        gate: Option<oneshot::Receiver<()>>,
    ) {
        self.feeds
            .lock()
            .unwrap()
            .entry((category.map(str::to_string), page))
            .or_default()
            .push_back(Scripted { result, gate });
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn fetch_feed(&self, query: &FeedQuery) -> Result<FeedPage, FetchError> {
        self.queries.lock().unwrap().push(query.clone());

        let scripted = self
            .feeds
            .lock()
            .unwrap()
            .get_mut(&(query.category.clone(), query.page))
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Scripted { result, gate }) => {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                result
            }
            None => Ok(FeedPage::default()),
        }
    }

    async fn fetch_categories(&self) -> Result<Vec<Category>, FetchError> {
        self.categories
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn track_view(&self, event: &ViewEvent) -> Result<(), TrackingFlushError> {
        self.views.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// MediaSurface that records the commands it receives
#[derive(Default)]
pub struct RecordingSurface {
    playing: AtomicBool,
    play_calls: AtomicUsize,
}

impl RecordingSurface {
    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }
}

impl MediaSurface for RecordingSurface {
    fn play(&self) {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        self.playing.store(true, Ordering::SeqCst);
    }

    fn pause(&self) {
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

/// Listing with one image and one video
pub fn video_item(id: &str) -> FeedItem {
    let mut item = image_item(id);
    item.videos = vec![format!("https://cdn.example/{}.mp4", id)];
    item
}

/// Listing with one image and no video
pub fn image_item(id: &str) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        title: format!("Listing {}", id),
        description: "Good condition".to_string(),
        price: 15_000.0,
        currency: "DZD".to_string(),
        category: "Electronics".to_string(),
        location: "Algiers".to_string(),
        images: vec![format!("https://cdn.example/{}.jpg", id)],
        videos: Vec::new(),
        seller: SellerRef {
            id: "s-1".to_string(),
            name: "Karim".to_string(),
            avatar: None,
            verified: true,
            is_premium: false,
        },
        like_count: 10,
        comment_count: 2,
        views: 100,
        video_views: 40,
        status: Some("available".to_string()),
        created_at: chrono::Utc::now(),
        viewer_has_liked: false,
    }
}

/// Page of video listings
pub fn page(ids: &[&str], has_more: Option<bool>) -> FeedPage {
    FeedPage {
        items: ids.iter().map(|id| video_item(id)).collect(),
        has_more,
    }
}

pub fn category(name: &str, item_count: u64) -> Category {
    Category {
        id: name.to_lowercase(),
        name: name.to_string(),
        item_count,
        total_views: 0,
    }
}

pub fn ids(items: &[FeedItem]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}
