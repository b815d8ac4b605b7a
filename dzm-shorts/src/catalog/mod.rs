//! Catalog Service seam
//!
//! The feed engine only talks to the marketplace through `CatalogService`,
//! so sessions can run against the HTTP client in production and against
//! in-memory fakes in tests.

pub mod http;

use crate::error::{FetchError, TrackingFlushError};
use async_trait::async_trait;
use dzm_common::models::FeedPayload;
use dzm_common::{Category, FeedItem, ViewEvent};
use tracing::warn;

pub use http::HttpCatalog;

/// One request against `GET /shorts/feed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Category name filter, None for the unfiltered feed
    pub category: Option<String>,
    /// 1-based page number
    pub page: u32,
    /// Listings per page
    pub limit: u32,
}

/// A page of listings as returned by the catalog
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Server's paging hint; None when the server does not report it
    pub has_more: Option<bool>,
}

impl FeedPage {
    /// Build a page from the wire payload, dropping listings without media
    pub fn from_payload(payload: FeedPayload) -> Self {
        let mut items = payload.products;
        let before = items.len();
        items.retain(FeedItem::is_displayable);
        let dropped = before - items.len();
        if dropped > 0 {
            warn!(dropped, "Dropped listings with neither images nor videos");
        }

        Self {
            items,
            has_more: payload.has_more,
        }
    }
}

/// Marketplace catalog operations used by the feed
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch one page of the shorts feed
    async fn fetch_feed(&self, query: &FeedQuery) -> Result<FeedPage, FetchError>;

    /// Fetch the categories that have shorts content
    async fn fetch_categories(&self) -> Result<Vec<Category>, FetchError>;

    /// Report how long a listing stayed on screen
    async fn track_view(&self, event: &ViewEvent) -> Result<(), TrackingFlushError>;
}
