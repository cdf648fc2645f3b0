//! Shared controller contract.
//!
//! Every backend controller composes a [`ControllerState`] (lifecycle flags,
//! pending-operation store, element binding) and exposes the same
//! [`Controller`] surface to the manager. Backend glue never touches the
//! state directly; it calls `dispatch` with one of the backend's signals.

pub mod frame;
pub mod twitch;
pub mod youtube;

use tokio::sync::watch;

use crate::error::ControllerError;
use crate::manager::Manager;
use crate::media::{ElementBinding, ElementId, ElementRef, MediaDuration, Screenshot};

/// Commands accepted before the backend could honour them.
///
/// One slot per kind; a newer request overwrites the older one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pending {
    pub play: bool,
    pub pause: bool,
    pub seek: Option<f64>,
    pub stop: bool,
}

impl Pending {
    pub fn clear(&mut self) {
        *self = Pending::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Pending::default()
    }

    pub(crate) fn take_pause(&mut self) -> bool {
        std::mem::take(&mut self.pause)
    }

    pub(crate) fn take_stop(&mut self) -> bool {
        std::mem::take(&mut self.stop)
    }
}

/// Point-in-time view of a controller, for the manager and for tests
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub key: &'static str,
    pub source: Option<String>,
    pub duration: Option<MediaDuration>,
    pub playing: bool,
    pub stopped: bool,
    pub hooked: bool,
    pub showing: bool,
    pub video: bool,
    pub element: Option<ElementId>,
    pub pending: Pending,
}

/// Resolves once a controller can accept commands
#[derive(Debug, Clone)]
pub struct ReadySignal(watch::Receiver<bool>);

impl ReadySignal {
    pub(crate) fn channel() -> (watch::Sender<bool>, ReadySignal) {
        let (tx, rx) = watch::channel(false);
        (tx, ReadySignal(rx))
    }

    pub fn is_ready(&self) -> bool {
        *self.0.borrow()
    }

    /// Wait for readiness. Returns early if the controller is dropped first.
    pub async fn wait(mut self) {
        let _ = self.0.wait_for(|ready| *ready).await;
    }
}

/// Playback contract the manager drives.
///
/// Default bodies form the inert controller: commands do nothing, there is
/// no timeline and nothing to capture.
pub trait Controller: Send + Sync {
    fn key(&self) -> &'static str;
    fn ready(&self) -> ReadySignal;
    fn status(&self) -> ControllerStatus;

    fn play(&self, _muted: bool) {}
    fn pause(&self) {}
    fn stop(&self) {}
    fn seek(&self, _time: f64) {}
    fn set(&self, _source: Option<&str>) {}

    /// Current playback position in seconds
    fn time(&self) -> f64 {
        0.0
    }

    fn screenshot(&self) -> Option<Screenshot> {
        None
    }

    /// Whether content can change without a new `set()`
    fn dynamic(&self) -> bool {
        false
    }

    fn show(&self) {}
    fn hide(&self) {}
}

/// Lifecycle state shared by all backend controllers
pub(crate) struct ControllerState {
    pub(crate) key: &'static str,
    pub(crate) manager: Manager,
    pub(crate) source: Option<String>,
    pub(crate) duration: Option<MediaDuration>,
    pub(crate) playing: bool,
    pub(crate) stopped: bool,
    pub(crate) showing: bool,
    pub(crate) pending: Pending,
    pub(crate) binding: ElementBinding,
}

impl ControllerState {
    pub(crate) fn new(key: &'static str, manager: Manager) -> Self {
        Self {
            key,
            manager,
            source: None,
            duration: None,
            playing: false,
            stopped: true,
            showing: true,
            pending: Pending::default(),
            binding: ElementBinding::default(),
        }
    }

    pub(crate) fn hooked(&self) -> bool {
        self.binding.bound().is_some()
    }

    pub(crate) fn element(&self) -> Option<ElementRef> {
        self.binding.element()
    }

    /// Record the first reported duration; later reports are ignored
    pub(crate) fn capture_duration(&mut self, duration: MediaDuration) -> bool {
        if self.duration.is_some() {
            return false;
        }
        tracing::debug!(controller = self.key, ?duration, "duration captured");
        self.duration = Some(duration);
        true
    }

    /// Bind `element` and notify the manager if a new audio tap was built
    pub(crate) fn hook(&mut self, element: &ElementRef) -> bool {
        let rebuilt = self.binding.bind(element, self.manager.audio());
        if rebuilt {
            tracing::info!(controller = self.key, element = %element.id(), "hooked media element");
            self.manager.controller_hooked(self.key);
        }
        rebuilt
    }

    pub(crate) fn unhook(&mut self) {
        if let Some(bound) = self.binding.bound() {
            tracing::info!(controller = self.key, element = %bound.id(), "unhooked media element");
        }
        self.binding.release();
    }

    pub(crate) fn seeked(&self) {
        self.manager.seeked(self.key);
    }

    pub(crate) fn report(&self, error: ControllerError) {
        self.manager.controller_error(self.key, error);
    }

    pub(crate) fn status(&self, video: bool) -> ControllerStatus {
        ControllerStatus {
            key: self.key,
            source: self.source.clone(),
            duration: self.duration,
            playing: self.playing,
            stopped: self.stopped,
            hooked: self.hooked(),
            showing: self.showing,
            video,
            element: self.binding.bound().map(|bound| bound.id()),
            pending: self.pending.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_overwrite_and_take() {
        let mut pending = Pending::default();
        assert!(pending.is_empty());

        pending.seek = Some(10.0);
        pending.seek = Some(20.0);
        pending.pause = true;
        assert_eq!(pending.seek.take(), Some(20.0));
        assert!(pending.take_pause());
        assert!(!pending.take_pause());

        pending.stop = true;
        pending.play = true;
        pending.clear();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn test_ready_signal() {
        let (tx, ready) = ReadySignal::channel();
        assert!(!ready.is_ready());

        let waiter = tokio::spawn(ready.clone().wait());
        tx.send_replace(true);
        waiter.await.unwrap();
        assert!(ready.is_ready());
    }
}
