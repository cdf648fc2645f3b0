//! Controller for the Twitch channel/VOD embed.
//!
//! The SDK reports lifecycle through events but can silently fail to emit
//! its "playing" confirmation, and gates some content behind overlays that
//! only show up in its rendered document. `play()` therefore arms a
//! watchdog and an overlay probe alongside the actual command.

use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::{Controller, ControllerState, ControllerStatus, ReadySignal};
use crate::error::ControllerError;
use crate::manager::Manager;
use crate::media::{ElementId, ElementRef, Screenshot};
use crate::settings::{ControllerTimings, SETTINGS};
use crate::timer::{clear, spawn_interval, spawn_timeout, TimerHandle};
use crate::utils::lock;
use crate::utils::parsing::{stream_duration, TwitchSource};

pub const TWITCH_KEY: &str = "twitch";

/// Commands and document probes on the embedded Twitch player
pub trait TwitchBackend: Send + 'static {
    /// True once the embed answers state queries
    fn is_queryable(&self) -> bool;
    fn set_channel(&mut self, channel: &str);
    fn set_video(&mut self, video: &str);
    /// Channel the embed is currently tuned to
    fn channel(&self) -> Option<String>;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, time: f64);
    fn set_muted(&mut self, muted: bool);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn set_opacity(&mut self, opacity: f32);

    /// The `<video>` rendered inside the embed's document
    fn video_element(&self) -> Option<ElementRef>;
    /// Subscriber-only or other blocking gate overlay is shown
    fn has_gate_overlay(&self) -> bool;
    /// Click away the muted-segments alert. Returns true if one was present.
    fn dismiss_muted_segments_alert(&mut self) -> bool;
    /// Accept the mature-content warning. Returns true if one was present.
    fn accept_mature_content(&mut self) -> bool;
}

/// SDK events, plus the bound element's seek completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwitchSignal {
    Ready,
    Play,
    Playing,
    Pause,
    PlaybackBlocked,
    Offline,
    Ended,
    ElementSeeked(ElementId),
}

/// Options passed to the embed constructor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwitchEmbedOptions {
    pub width: String,
    pub height: String,
    pub channel: String,
    pub autoplay: bool,
    pub parent: Vec<String>,
}

impl TwitchEmbedOptions {
    pub fn new(config: &TwitchConfig, parent: &str) -> Self {
        Self {
            width: "100%".to_string(),
            height: "100%".to_string(),
            channel: config.placeholder_channel.clone(),
            autoplay: false,
            parent: vec![parent.to_string()],
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TwitchConfig {
    /// Channel tuned between sources so the SDK tears the old one down
    pub placeholder_channel: String,
    pub timings: ControllerTimings,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            placeholder_channel: SETTINGS.twitch_placeholder_channel.clone(),
            timings: SETTINGS.timings(),
        }
    }
}

struct TwitchInner<B> {
    state: ControllerState,
    backend: B,
    config: TwitchConfig,
    this: Weak<Mutex<TwitchInner<B>>>,
    ready_tx: watch::Sender<bool>,
    ready: bool,
    tuned: bool,
    awaiting_playing: bool,
    readiness: Option<TimerHandle>,
    player_check: Option<TimerHandle>,
    gate_check: Option<TimerHandle>,
    seek_debounce: Option<TimerHandle>,
}

impl<B: TwitchBackend> TwitchInner<B> {
    fn active(&self) -> bool {
        self.ready && self.state.source.is_some()
    }

    fn check_ready(&mut self) -> bool {
        if !self.ready && self.backend.is_queryable() {
            debug!(controller = TWITCH_KEY, "embed ready");
            self.ready = true;
            self.ready_tx.send_replace(true);
            clear(&mut self.readiness);
        }
        self.ready
    }

    fn clear_playback_timers(&mut self) {
        clear(&mut self.player_check);
        clear(&mut self.gate_check);
    }

    /// Leave the current content by tuning to the placeholder channel
    fn park(&mut self) {
        self.backend.set_opacity(0.0);
        self.backend.set_channel(&self.config.placeholder_channel);
        self.backend.pause();
        self.clear_playback_timers();
    }

    /// Reset playback and tune the embed to the assigned source
    fn retune(&mut self) -> bool {
        let Some(source) = self.state.source.clone() else {
            return false;
        };

        self.park();
        self.state.playing = false;
        self.awaiting_playing = false;
        self.state.stopped = true;
        self.state.duration = None;
        self.state.unhook();
        self.state.seeked();

        match TwitchSource::parse(&source) {
            Ok(TwitchSource::Channel(channel)) => self.backend.set_channel(&channel),
            Ok(TwitchSource::Video(video)) => self.backend.set_video(&video),
            Err(e) => {
                warn!(controller = TWITCH_KEY, source = %source, "cannot tune: {}", e);
                self.tuned = false;
                self.state.report(e);
                return false;
            }
        }
        debug!(controller = TWITCH_KEY, source = %source, "tuned");
        self.tuned = true;
        true
    }

    fn tuned_to_source(&self) -> bool {
        let tuned = self.backend.channel();
        let assigned = self
            .state
            .source
            .as_deref()
            .and_then(|source| TwitchSource::parse(source).ok());

        match (assigned.as_ref().and_then(TwitchSource::channel), tuned) {
            (Some(assigned), Some(tuned)) => assigned.eq_ignore_ascii_case(&tuned),
            _ => false,
        }
    }

    fn hook(&mut self) -> bool {
        match self.backend.video_element() {
            Some(element) => {
                self.state.hook(&element);
                true
            }
            None => {
                self.state.report(ControllerError::SourceNotFound);
                self.state.unhook();
                self.stop();
                false
            }
        }
    }

    fn refuse(&mut self, error: ControllerError) {
        self.state.report(error);
        self.stop();
    }

    fn dispatch(&mut self, signal: TwitchSignal) {
        trace!(controller = TWITCH_KEY, ?signal, "sdk signal");
        match signal {
            TwitchSignal::Ready => {
                self.check_ready();
                if self.state.source.is_some() && self.backend.has_gate_overlay() {
                    self.refuse(ControllerError::TwitchVodSubOnly);
                }
            }
            TwitchSignal::Play => {
                if !self.state.hooked() && !self.hook() {
                    return;
                }
                if self.state.showing {
                    self.backend.set_opacity(1.0);
                }
                self.state.playing = true;
                self.state.stopped = false;
            }
            TwitchSignal::Playing => self.confirm_playing(),
            TwitchSignal::Pause => self.state.playing = false,
            TwitchSignal::PlaybackBlocked => {
                if self.tuned_to_source() {
                    self.refuse(ControllerError::TwitchPlaybackBlocked);
                } else {
                    trace!(controller = TWITCH_KEY, "ignoring blocked event for stale channel");
                }
            }
            TwitchSignal::Offline => {
                if self.tuned_to_source() {
                    self.refuse(ControllerError::TwitchChannelOffline);
                } else {
                    trace!(controller = TWITCH_KEY, "ignoring offline event for stale channel");
                }
            }
            TwitchSignal::Ended => {
                if self.state.playing {
                    self.state.manager.controller_ended(TWITCH_KEY);
                }
                self.stop();
            }
            TwitchSignal::ElementSeeked(id) => {
                if !self.state.binding.is_bound_to(id) {
                    return;
                }
                clear(&mut self.seek_debounce);
                self.seek_debounce = Some(spawn_timeout(
                    self.this.clone(),
                    self.config.timings.seeked_debounce,
                    |inner: &mut TwitchInner<B>| inner.state.seeked(),
                ));
            }
        }
    }

    fn confirm_playing(&mut self) {
        self.awaiting_playing = false;
        self.clear_playback_timers();

        match stream_duration(self.backend.duration()) {
            Some(duration) => {
                self.state.capture_duration(duration);
            }
            None => trace!(controller = TWITCH_KEY, "duration not known yet"),
        }

        if self.backend.dismiss_muted_segments_alert() {
            debug!(controller = TWITCH_KEY, "dismissed muted segments alert");
        }
        if self.backend.accept_mature_content() {
            debug!(controller = TWITCH_KEY, "accepted mature content warning");
        }

        self.state.manager.hide_spinner();

        if self.state.pending.take_pause() {
            self.pause();
        }
        if let Some(time) = self.state.pending.seek.take() {
            self.seek(time);
        }
    }

    fn play(&mut self, muted: bool) {
        if !self.active() {
            return;
        }

        self.state.manager.show_spinner();

        if self.state.stopped && !self.tuned && !self.retune() {
            self.state.manager.hide_spinner();
            return;
        }

        self.awaiting_playing = true;
        self.state.pending.pause = false;
        self.backend.set_muted(muted || self.state.pending.seek.is_some());
        self.backend.play();

        self.clear_playback_timers();

        self.player_check = Some(spawn_timeout(
            self.this.clone(),
            self.config.timings.player_check_timeout,
            |inner: &mut TwitchInner<B>| {
                if inner.awaiting_playing {
                    inner.state.manager.controller_resync(TWITCH_KEY);
                }
            },
        ));

        self.gate_check = Some(spawn_interval(
            self.this.clone(),
            self.config.timings.gate_check_interval,
            |inner: &mut TwitchInner<B>| {
                if inner.backend.has_gate_overlay() {
                    inner.refuse(ControllerError::TwitchVodSubOnly);
                    ControlFlow::Break(())
                } else if inner.state.playing {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        ));
    }

    fn pause(&mut self) {
        if !self.active() {
            return;
        }

        self.awaiting_playing = false;
        self.state.pending.pause = false;
        self.clear_playback_timers();

        if self.state.playing {
            self.backend.pause();
        } else {
            self.state.pending.pause = true;
        }
    }

    fn stop(&mut self) {
        if !self.active() {
            return;
        }

        debug!(controller = TWITCH_KEY, "stopping");
        self.state.duration = None;
        self.awaiting_playing = false;
        self.state.stopped = true;
        self.state.playing = false;
        self.state.pending.clear();
        self.state.unhook();

        self.park();
        clear(&mut self.seek_debounce);
        self.tuned = false;

        self.state.manager.hide_spinner();
        self.state.seeked();
    }

    fn seek(&mut self, time: f64) {
        if !self.active() {
            return;
        }

        clear(&mut self.seek_debounce);

        if self.state.playing {
            self.state.pending.seek = None;
            self.backend.seek(time);
            self.backend.set_muted(false);
        } else {
            self.state.pending.seek = Some(time);
        }
    }

    fn set(&mut self, source: Option<&str>) {
        if !self.ready || source == self.state.source.as_deref() {
            return;
        }

        let Some(source) = source else {
            self.stop();
            self.state.source = None;
            return;
        };

        self.state.source = Some(source.to_string());
        self.state.pending.clear();
        clear(&mut self.seek_debounce);
        self.retune();
    }

    fn time(&self) -> f64 {
        if !self.active() {
            return 0.0;
        }
        self.backend.current_time()
    }

    fn screenshot(&self) -> Option<Screenshot> {
        if !self.state.playing || self.state.source.is_none() {
            return None;
        }
        Screenshot::capture(&self.state.element()?)
    }

    fn show(&mut self) {
        self.state.showing = true;
        if !self.state.stopped {
            self.backend.set_opacity(1.0);
        }
    }

    fn hide(&mut self) {
        self.state.showing = false;
        self.backend.set_opacity(0.0);
    }
}

/// Livestream controller. Clones share the same state.
pub struct TwitchController<B> {
    inner: Arc<Mutex<TwitchInner<B>>>,
    ready: ReadySignal,
}

impl<B> Clone for TwitchController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ready: self.ready.clone(),
        }
    }
}

impl<B: TwitchBackend> TwitchController<B> {
    pub fn new(manager: Manager, backend: B) -> Self {
        Self::with_config(manager, backend, TwitchConfig::default())
    }

    /// Wrap an embed that was created with [`TwitchEmbedOptions`] for `config`.
    ///
    /// Must be called inside a tokio runtime. The controller polls the embed
    /// until it answers queries, then resolves its ready signal.
    pub fn with_config(manager: Manager, mut backend: B, config: TwitchConfig) -> Self {
        backend.set_opacity(0.0);

        let (ready_tx, ready) = ReadySignal::channel();
        let poll_interval = config.timings.sdk_poll_interval;

        let inner = Arc::new_cyclic(|this| {
            Mutex::new(TwitchInner {
                state: ControllerState::new(TWITCH_KEY, manager),
                backend,
                config,
                this: this.clone(),
                ready_tx,
                ready: false,
                tuned: false,
                awaiting_playing: false,
                readiness: None,
                player_check: None,
                gate_check: None,
                seek_debounce: None,
            })
        });

        let readiness = spawn_interval(
            Arc::downgrade(&inner),
            poll_interval,
            |inner: &mut TwitchInner<B>| {
                if inner.check_ready() {
                    ControlFlow::Break(())
                } else {
                    trace!(controller = TWITCH_KEY, "embed not queryable yet");
                    ControlFlow::Continue(())
                }
            },
        );
        lock(&inner).readiness = Some(readiness);

        Self { inner, ready }
    }

    /// Feed an SDK or element event into the state machine
    pub fn dispatch(&self, signal: TwitchSignal) {
        lock(&self.inner).dispatch(signal);
    }

    /// Run `f` against the backend, e.g. to inspect a test double
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut lock(&self.inner).backend)
    }
}

impl<B: TwitchBackend> Controller for TwitchController<B> {
    fn key(&self) -> &'static str {
        TWITCH_KEY
    }

    fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    fn status(&self) -> ControllerStatus {
        lock(&self.inner).state.status(true)
    }

    fn play(&self, muted: bool) {
        lock(&self.inner).play(muted);
    }

    fn pause(&self) {
        lock(&self.inner).pause();
    }

    fn stop(&self) {
        lock(&self.inner).stop();
    }

    fn seek(&self, time: f64) {
        lock(&self.inner).seek(time);
    }

    fn set(&self, source: Option<&str>) {
        lock(&self.inner).set(source);
    }

    fn time(&self) -> f64 {
        lock(&self.inner).time()
    }

    fn screenshot(&self) -> Option<Screenshot> {
        lock(&self.inner).screenshot()
    }

    fn dynamic(&self) -> bool {
        true
    }

    fn show(&self) {
        lock(&self.inner).show();
    }

    fn hide(&self) {
        lock(&self.inner).hide();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_options_json() {
        let config = TwitchConfig {
            placeholder_channel: "twitchdev".to_string(),
            timings: ControllerTimings::STANDARD,
        };
        let options = TwitchEmbedOptions::new(&config, "localhost");
        let json: serde_json::Value = serde_json::from_str(&options.to_json().unwrap()).unwrap();

        assert_eq!(json["channel"], "twitchdev");
        assert_eq!(json["autoplay"], false);
        assert_eq!(json["width"], "100%");
        assert_eq!(json["parent"][0], "localhost");
    }
}
