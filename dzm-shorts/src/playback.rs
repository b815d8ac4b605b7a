//! Playback Coordinator
//!
//! Keeps at most one mounted media surface playing: the one showing the
//! active listing, and only if that listing has video.
//!
//! Surfaces are owned by the render layer, which mounts and unmounts them;
//! the coordinator only commands them. They are looked up by listing id, not
//! by render position, so a spliced or reset feed cannot leave a stale
//! handle pointing at the wrong listing.

use dzm_common::events::PlaybackState;
use dzm_common::FeedItem;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// A mounted video element the coordinator can command
pub trait MediaSurface: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn is_playing(&self) -> bool;
}

#[derive(Debug, Clone)]
struct ActiveMedia {
    item_id: String,
    has_video: bool,
}

/// Enforces the single-playing-surface rule
#[derive(Default)]
pub struct PlaybackCoordinator {
    surfaces: HashMap<String, Arc<dyn MediaSurface>>,
    active: Option<ActiveMedia>,
}

impl PlaybackCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface the render layer mounted for a listing
    ///
    /// A surface mounted for the active listing starts playing right away;
    /// any other surface is paused.
    pub fn mount(&mut self, item_id: &str, surface: Arc<dyn MediaSurface>) {
        if let Some(previous) = self.surfaces.insert(item_id.to_string(), Arc::clone(&surface)) {
            if !Arc::ptr_eq(&previous, &surface) {
                previous.pause();
            }
        }

        if self.is_active_video(item_id) {
            self.pause_all_except(item_id);
            surface.play();
            debug!(item_id = %item_id, "Mounted active surface, playing");
        } else {
            surface.pause();
            trace!(item_id = %item_id, "Mounted surface");
        }
    }

    /// Forget a surface the render layer destroyed
    pub fn unmount(&mut self, item_id: &str) -> Option<Arc<dyn MediaSurface>> {
        self.surfaces.remove(item_id)
    }

    pub fn is_mounted(&self, item_id: &str) -> bool {
        self.surfaces.contains_key(item_id)
    }

    /// Listing ids that currently have a surface
    pub fn mounted_ids(&self) -> impl Iterator<Item = &str> {
        self.surfaces.keys().map(String::as_str)
    }

    /// Make `item` the active listing
    ///
    /// Every other surface is paused first. If the listing has video and its
    /// surface is mounted, it is told to play, overriding any earlier manual
    /// pause. Passing None (empty feed, reset) pauses everything.
    pub fn set_active(&mut self, item: Option<&FeedItem>) {
        self.active = item.map(|item| ActiveMedia {
            item_id: item.id.clone(),
            has_video: item.has_video(),
        });

        match self.active.clone() {
            Some(active) if !active.has_video => {
                self.pause_all();
                debug!(item_id = %active.item_id, "Active listing is image-only");
            }
            Some(active) => {
                self.pause_all_except(&active.item_id);
                match self.surfaces.get(&active.item_id) {
                    Some(surface) => {
                        surface.play();
                        debug!(item_id = %active.item_id, "Autoplaying active surface");
                    }
                    None => {
                        debug!(item_id = %active.item_id, "Active surface not mounted yet");
                    }
                }
            }
            None => self.pause_all(),
        }
    }

    /// Tap-to-pause/resume on the active surface
    ///
    /// Returns the surface's new state, or None when the active listing has
    /// no playable surface. The active listing does not change.
    pub fn toggle_active(&mut self) -> Option<PlaybackState> {
        let active = self.active.as_ref().filter(|a| a.has_video)?;
        let surface = self.surfaces.get(&active.item_id)?;

        if surface.is_playing() {
            surface.pause();
            Some(PlaybackState::Paused)
        } else {
            surface.play();
            Some(PlaybackState::Playing)
        }
    }

    /// Pause every mounted surface
    pub fn pause_all(&mut self) {
        for surface in self.surfaces.values() {
            surface.pause();
        }
    }

    /// Listing id the coordinator currently treats as active
    pub fn active_item(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.item_id.as_str())
    }

    /// Number of mounted surfaces reporting that they are playing
    pub fn playing_count(&self) -> usize {
        self.surfaces.values().filter(|s| s.is_playing()).count()
    }

    fn is_active_video(&self, item_id: &str) -> bool {
        self.active
            .as_ref()
            .map(|a| a.has_video && a.item_id == item_id)
            .unwrap_or(false)
    }

    fn pause_all_except(&self, item_id: &str) {
        for (id, surface) in &self.surfaces {
            if id != item_id {
                surface.pause();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dzm_common::SellerRef;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSurface {
        playing: AtomicBool,
        play_calls: AtomicUsize,
    }

    impl MediaSurface for FakeSurface {
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

    fn item(id: &str, has_video: bool) -> FeedItem {
        FeedItem {
            id: id.to_string(),
            title: "Bicycle".to_string(),
            description: String::new(),
            price: 35_000.0,
            currency: "DZD".to_string(),
            category: "Sports".to_string(),
            location: "Setif".to_string(),
            images: vec![format!("{}.jpg", id)],
            videos: if has_video { vec![format!("{}.mp4", id)] } else { Vec::new() },
            seller: SellerRef {
                id: "s-4".to_string(),
                name: "Walid".to_string(),
                avatar: None,
                verified: false,
                is_premium: false,
            },
            like_count: 0,
            comment_count: 0,
            views: 0,
            video_views: 0,
            status: None,
            created_at: chrono::Utc::now(),
            viewer_has_liked: false,
        }
    }

    fn mounted(ids: &[&str]) -> (PlaybackCoordinator, Vec<Arc<FakeSurface>>) {
        let mut coordinator = PlaybackCoordinator::new();
        let surfaces: Vec<Arc<FakeSurface>> = ids.iter().map(|_| Arc::new(FakeSurface::default())).collect();
        for (id, surface) in ids.iter().zip(&surfaces) {
            coordinator.mount(id, surface.clone());
        }
        (coordinator, surfaces)
    }

    #[test]
    fn test_set_active_plays_only_active_surface() {
        let (mut coordinator, surfaces) = mounted(&["a", "b", "c"]);

        coordinator.set_active(Some(&item("b", true)));
        assert!(surfaces[1].is_playing());
        assert_eq!(coordinator.playing_count(), 1);

        coordinator.set_active(Some(&item("c", true)));
        assert!(!surfaces[1].is_playing());
        assert!(surfaces[2].is_playing());
        assert_eq!(coordinator.playing_count(), 1);
    }

    #[test]
    fn test_image_only_item_plays_nothing() {
        let (mut coordinator, surfaces) = mounted(&["a", "c"]);

        coordinator.set_active(Some(&item("a", true)));
        let plays_before: usize = surfaces.iter().map(|s| s.play_calls.load(Ordering::SeqCst)).sum();

        coordinator.set_active(Some(&item("b", false)));

        let plays_after: usize = surfaces.iter().map(|s| s.play_calls.load(Ordering::SeqCst)).sum();
        assert_eq!(plays_before, plays_after);
        assert_eq!(coordinator.playing_count(), 0);
        assert_eq!(coordinator.active_item(), Some("b"));
    }

    #[test]
    fn test_manual_pause_is_overridden_on_arrival() {
        let (mut coordinator, surfaces) = mounted(&["a", "b"]);

        coordinator.set_active(Some(&item("a", true)));
        assert_eq!(coordinator.toggle_active(), Some(PlaybackState::Paused));
        assert!(!surfaces[0].is_playing());

        coordinator.set_active(Some(&item("b", true)));
        coordinator.set_active(Some(&item("a", true)));
        assert!(surfaces[0].is_playing());
    }

    #[test]
    fn test_toggle_on_image_only_item_is_noop() {
        let (mut coordinator, _surfaces) = mounted(&["a"]);
        coordinator.set_active(Some(&item("b", false)));
        assert_eq!(coordinator.toggle_active(), None);
    }

    #[test]
    fn test_late_mount_of_active_surface_autoplays() {
        let (mut coordinator, surfaces) = mounted(&["a"]);
        coordinator.set_active(Some(&item("a", true)));
        coordinator.set_active(Some(&item("b", true)));

        let late = Arc::new(FakeSurface::default());
        coordinator.mount("b", late.clone());

        assert!(late.is_playing());
        assert!(!surfaces[0].is_playing());
        assert_eq!(coordinator.playing_count(), 1);
    }

    #[test]
    fn test_clearing_active_pauses_everything() {
        let (mut coordinator, _surfaces) = mounted(&["a", "b"]);
        coordinator.set_active(Some(&item("a", true)));

        coordinator.set_active(None);

        assert_eq!(coordinator.playing_count(), 0);
        assert_eq!(coordinator.active_item(), None);
    }

    #[test]
    fn test_mounted_ids_tracks_mount_and_unmount() {
        let (mut coordinator, _surfaces) = mounted(&["a", "b", "c"]);
        coordinator.unmount("b");

        let mut ids: Vec<&str> = coordinator.mounted_ids().collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_unmount_forgets_surface() {
        let (mut coordinator, _surfaces) = mounted(&["a"]);
        assert!(coordinator.unmount("a").is_some());
        assert!(!coordinator.is_mounted("a"));

        coordinator.set_active(Some(&item("a", true)));
        assert_eq!(coordinator.playing_count(), 0);
    }
}
