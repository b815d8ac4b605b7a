//! Engagement Tracker
//!
//! Dwell-time measurement and optimistic likes for one feed session.
//!
//! Watching is a two-state machine, `Idle` and `Watching(item, started_at)`.
//! The start instant lives only inside the `Watching` state and is consumed
//! by `transition`, which closes the open interval and opens the next one in
//! a single call. Every closed interval yields exactly one `ViewEvent`.
//!
//! Like overrides are a sparse correction layer over the server's counters:
//! the server count is never edited.

use dzm_common::time::whole_seconds;
use dzm_common::{FeedItem, ViewEvent};
use std::collections::HashMap;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchState {
    Idle,
    Watching { item_id: String, started_at: Instant },
}

/// Per-session dwell timer and like overrides
#[derive(Debug)]
pub struct EngagementTracker {
    state: WatchState,

    /// Viewer's like state for listings toggled this session
    liked_overrides: HashMap<String, bool>,
}

impl EngagementTracker {
    pub fn new() -> Self {
        Self {
            state: WatchState::Idle,
            liked_overrides: HashMap::new(),
        }
    }

    /// Listing currently being timed
    pub fn watching(&self) -> Option<&str> {
        match &self.state {
            WatchState::Idle => None,
            WatchState::Watching { item_id, .. } => Some(item_id),
        }
    }

    /// Close the open interval (if any) and open one for `next` (if any)
    ///
    /// Returns the view event for the interval that was closed.
    pub fn transition(&mut self, next: Option<&str>, now: Instant) -> Option<ViewEvent> {
        let next_state = match next {
            Some(item_id) => WatchState::Watching {
                item_id: item_id.to_string(),
                started_at: now,
            },
            None => WatchState::Idle,
        };

        match std::mem::replace(&mut self.state, next_state) {
            WatchState::Idle => None,
            WatchState::Watching {
                item_id,
                started_at,
            } => {
                let duration_secs = whole_seconds(now.saturating_duration_since(started_at));
                debug!(item_id = %item_id, duration_secs, "Closed watch interval");
                Some(ViewEvent {
                    item_id,
                    duration_secs,
                    flushed_at: dzm_common::time::now(),
                })
            }
        }
    }

    /// Start timing `item_id`, closing whatever was open
    pub fn activate(&mut self, item_id: &str, now: Instant) -> Option<ViewEvent> {
        self.transition(Some(item_id), now)
    }

    /// Stop timing and go idle
    pub fn stop(&mut self, now: Instant) -> Option<ViewEvent> {
        self.transition(None, now)
    }

    /// Flip the viewer's like state for a listing; returns the new state
    ///
    /// `baseline` is whether the viewer had liked it when it was served.
    pub fn toggle_like(&mut self, item_id: &str, baseline: bool) -> bool {
        let liked = !self.liked_overrides.get(item_id).copied().unwrap_or(baseline);
        self.liked_overrides.insert(item_id.to_string(), liked);
        liked
    }

    /// Whether the viewer currently likes the listing
    pub fn is_liked(&self, item: &FeedItem) -> bool {
        self.liked_overrides
            .get(&item.id)
            .copied()
            .unwrap_or(item.viewer_has_liked)
    }

    /// Like count to display: server count corrected by the viewer's toggles
    pub fn display_like_count(&self, item: &FeedItem) -> u64 {
        let baseline = u64::from(item.viewer_has_liked);
        let effective = u64::from(self.is_liked(item));
        item.like_count.saturating_sub(baseline) + effective
    }

    pub fn liked_overrides(&self) -> &HashMap<String, bool> {
        &self.liked_overrides
    }
}

impl Default for EngagementTracker {
    fn default() -> Self {
        Self::new()
    }
}
