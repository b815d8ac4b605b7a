//! Event types for the DZM feed
//!
//! Provides the shared `FeedEvent` definitions and the EventBus that carries
//! them to UI listeners (notification toasts, progress readouts, empty-state
//! views).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Play/pause state of a media surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Which fetch a failure notice refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    /// Replacing the whole feed (initial load or category change)
    Load,
    /// Appending the next page at the end of the feed
    Append,
}

/// Feed session event types
///
/// Emitted by the feed session controller; every variant carries the session
/// it came from so listeners shared between sessions can tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A listing became the active item
    ItemActivated {
        session_id: Uuid,
        item_id: String,
        /// Zero-based position in the loaded feed
        index: usize,
        /// Loaded feed length at activation time
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The loaded feed was replaced by a fresh fetch
    FeedLoaded {
        session_id: Uuid,
        /// Category the feed is filtered by, None when unfiltered
        category: Option<String>,
        item_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A page was appended to the loaded feed
    PageAppended {
        session_id: Uuid,
        added: usize,
        total: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The viewer reached the last listing and no more are available
    EndOfFeed {
        session_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The current filter yields no listings at all
    FeedEmpty {
        session_id: Uuid,
        category: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A fetch failed; the feed stays on its last good state
    FetchFailed {
        session_id: Uuid,
        kind: FetchKind,
        /// Human-readable reason for a transient notification
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The category list for the filter menu was refreshed
    CategoriesLoaded {
        session_id: Uuid,
        count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The viewer liked or unliked a listing
    LikeToggled {
        session_id: Uuid,
        item_id: String,
        liked: bool,
        /// Like count to display after the toggle
        display_count: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The active surface started or stopped playing
    PlaybackChanged {
        session_id: Uuid,
        item_id: String,
        state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl FeedEvent {
    /// Session that emitted this event
    pub fn session_id(&self) -> Uuid {
        match self {
            FeedEvent::ItemActivated { session_id, .. }
            | FeedEvent::FeedLoaded { session_id, .. }
            | FeedEvent::PageAppended { session_id, .. }
            | FeedEvent::EndOfFeed { session_id, .. }
            | FeedEvent::FeedEmpty { session_id, .. }
            | FeedEvent::FetchFailed { session_id, .. }
            | FeedEvent::CategoriesLoaded { session_id, .. }
            | FeedEvent::LikeToggled { session_id, .. }
            | FeedEvent::PlaybackChanged { session_id, .. } => *session_id,
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Distribution bus for feed events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block the session)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FeedEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
