use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::ControllerError;
use crate::events::ControllerEvent;
use crate::media::AudioContext;
use crate::settings::SETTINGS;

/// Handle to the orchestrating manager.
///
/// Controllers report lifecycle callbacks through it and borrow the shared
/// audio context from it. Cloning is cheap; every clone feeds the same
/// event stream.
#[derive(Clone)]
pub struct Manager {
    audio: Arc<dyn AudioContext>,
    event_sender: broadcast::Sender<ControllerEvent>,
}

impl Manager {
    pub fn new(audio: Arc<dyn AudioContext>) -> Self {
        Self::with_capacity(audio, SETTINGS.event_buffer_capacity)
    }

    pub fn with_capacity(audio: Arc<dyn AudioContext>, capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            audio,
            event_sender: event_tx,
        }
    }

    /// Get a channel for receiving controller callbacks
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_sender.subscribe()
    }

    pub fn audio(&self) -> &dyn AudioContext {
        self.audio.as_ref()
    }

    /// Helper method to send events - discards send errors (no subscribers)
    #[inline]
    fn send(&self, event: ControllerEvent) {
        let _ = self.event_sender.send(event);
    }

    pub fn controller_error(&self, key: &'static str, error: ControllerError) {
        warn!(controller = key, code = error.code(), "controller error: {}", error);
        self.send(ControllerEvent::Error { key, error });
    }

    pub fn controller_ended(&self, key: &'static str) {
        debug!(controller = key, "media ended");
        self.send(ControllerEvent::Ended { key });
    }

    pub fn controller_hooked(&self, key: &'static str) {
        debug!(controller = key, "media element hooked");
        self.send(ControllerEvent::Hooked { key });
    }

    pub fn controller_resync(&self, key: &'static str) {
        warn!(controller = key, "backend did not confirm playback, requesting resync");
        self.send(ControllerEvent::Resync { key });
    }

    /// A seek or reset has settled
    pub fn seeked(&self, key: &'static str) {
        self.send(ControllerEvent::Seeked { key });
    }

    pub fn show_spinner(&self) {
        self.send(ControllerEvent::ShowSpinner);
    }

    pub fn hide_spinner(&self) {
        self.send(ControllerEvent::HideSpinner);
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("subscribers", &self.event_sender.receiver_count())
            .finish_non_exhaustive()
    }
}
