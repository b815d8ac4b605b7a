//! FeedItem Store
//!
//! Holds the loaded window of listings for one category filter and the page
//! cursor used to extend it.
//!
//! Fetching and committing are separate steps so the session controller can
//! run the network call off its own thread and decide on return whether the
//! result still applies. `load` and `append_next_page` combine both steps for
//! callers that have no such race to worry about.
//!
//! A failed fetch never touches the loaded sequence.

use crate::catalog::{CatalogService, FeedPage, FeedQuery};
use crate::error::FetchError;
use dzm_common::{Category, FeedItem};
use std::sync::Arc;
use tracing::{debug, warn};

/// Loaded listings plus the paging cursor for the current filter
pub struct FeedStore {
    catalog: Arc<dyn CatalogService>,

    /// Loaded listings in feed order, duplicates across pages included
    items: Vec<FeedItem>,

    /// Category the loaded sequence belongs to
    category: Option<String>,

    /// Page to request on the next append (1-based)
    next_page: u32,

    /// Catalog's last paging hint; never gates an append
    has_more: bool,

    page_size: u32,
}

impl FeedStore {
    pub fn new(catalog: Arc<dyn CatalogService>, page_size: u32) -> Self {
        Self {
            catalog,
            items: Vec::new(),
            category: None,
            next_page: 1,
            has_more: true,
            page_size: page_size.max(1),
        }
    }

    /// Shared handle to the catalog this store fetches from
    pub fn catalog(&self) -> Arc<dyn CatalogService> {
        Arc::clone(&self.catalog)
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&FeedItem> {
        self.items.get(index)
    }

    /// First loaded listing with this id
    pub fn find(&self, item_id: &str) -> Option<&FeedItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Whether the catalog hinted that more pages exist
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Query for the first page of `category`
    pub fn load_query(&self, category: Option<&str>) -> FeedQuery {
        FeedQuery {
            category: category.map(str::to_string),
            page: 1,
            limit: self.page_size,
        }
    }

    /// Query for the page after the loaded ones, under the loaded filter
    pub fn next_page_query(&self) -> FeedQuery {
        FeedQuery {
            category: self.category.clone(),
            page: self.next_page,
            limit: self.page_size,
        }
    }

    /// Discard the loaded sequence and switch to a new filter
    pub fn reset(&mut self, category: Option<String>) {
        self.items.clear();
        self.category = category;
        self.next_page = 1;
        self.has_more = true;
    }

    /// Replace the loaded sequence with a freshly fetched first page
    pub fn commit_load(&mut self, category: Option<String>, page: FeedPage) {
        self.items = page.items;
        self.category = category;
        self.next_page = 2;
        self.has_more = page.has_more.unwrap_or(!self.items.is_empty());
        debug!(
            category = ?self.category,
            items = self.items.len(),
            has_more = self.has_more,
            "Feed loaded"
        );
    }

    /// Concatenate a fetched page; returns how many listings were added
    pub fn commit_append(&mut self, page: FeedPage) -> usize {
        let added = page.items.len();
        self.items.extend(page.items);

        if added > 0 {
            self.next_page += 1;
        }
        self.has_more = match page.has_more {
            Some(more) => more && added > 0,
            None => added > 0,
        };

        debug!(
            added,
            total = self.items.len(),
            next_page = self.next_page,
            has_more = self.has_more,
            "Feed page appended"
        );
        added
    }

    /// Fetch and commit the first page for `category`
    ///
    /// On failure the previously loaded sequence is kept as is.
    pub async fn load(&mut self, category: Option<&str>) -> Result<&[FeedItem], FetchError> {
        let query = self.load_query(category);
        let page = self.catalog.fetch_feed(&query).await?;
        self.commit_load(query.category, page);
        Ok(&self.items)
    }

    /// Fetch and append the next page for the loaded filter
    ///
    /// On failure the loaded sequence is unchanged and the error is returned
    /// for the caller to surface.
    pub async fn append_next_page(&mut self) -> Result<usize, FetchError> {
        let query = self.next_page_query();
        let page = self.catalog.fetch_feed(&query).await?;
        Ok(self.commit_append(page))
    }

    /// Category list for the filter menu; empty when unavailable
    pub async fn load_categories(&self) -> Vec<Category> {
        fetch_categories_soft(self.catalog.as_ref()).await
    }
}

/// Fetch categories, degrading to an empty list on failure
pub(crate) async fn fetch_categories_soft(catalog: &dyn CatalogService) -> Vec<Category> {
    match catalog.fetch_categories().await {
        Ok(categories) => categories,
        Err(e) => {
            warn!(error = %e, "Category list unavailable");
            Vec::new()
        }
    }
}
