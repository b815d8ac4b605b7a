//! # DZM Common Library
//!
//! Shared code for the DZM marketplace clients including:
//! - Catalog wire models (listings, sellers, categories, view events)
//! - Event types (FeedEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::{Category, FeedItem, SellerRef, ViewEvent};
