//! # DZM Shorts Feed Engine (dzm-shorts)
//!
//! Vertical short-video feed for the DZM marketplace.
//!
//! **Purpose:** Page through marketplace listings one at a time, autoplay the
//! active listing's video, measure how long each listing stays on screen, and
//! apply optimistic likes.
//!
//! **Architecture:** A single-writer `FeedSession` drives the `FeedStore`,
//! `PlaybackCoordinator` and `EngagementTracker`. Catalog requests run as
//! spawned tasks whose results are applied back on the session; view reports
//! are delivered by a background worker.

pub mod catalog;
pub mod engagement;
pub mod error;
pub mod playback;
pub mod reporter;
pub mod session;
pub mod store;

pub use catalog::{CatalogService, FeedPage, FeedQuery, HttpCatalog};
pub use error::{Error, FetchError, Result, TrackingFlushError};
pub use playback::{MediaSurface, PlaybackCoordinator};
pub use session::{FeedSession, FeedStatus, Navigation, SessionOptions, SessionUpdate};
