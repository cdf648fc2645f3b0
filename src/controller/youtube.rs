//! Controller for the YouTube IFrame player.
//!
//! Readiness takes two asynchronous steps: the SDK script has to load
//! before the player can be constructed, and the constructed player only
//! accepts commands once it exposes its cueing API. After that, everything
//! the controller learns comes from the player-state enum, which is read on
//! every state-change notification.

use serde::Serialize;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;
use tracing::{debug, trace};

use super::{Controller, ControllerState, ControllerStatus, ReadySignal};
use crate::error::ControllerError;
use crate::manager::Manager;
use crate::media::{ElementRef, Screenshot};
use crate::settings::{ControllerTimings, SETTINGS};
use crate::timer::{clear, spawn_interval, spawn_timeout, TimerHandle};
use crate::utils::lock;
use crate::utils::parsing::reported_duration;
use crate::utils::state::PlayerState;

pub const YOUTUBE_KEY: &str = "youtube";

/// Elapsed time under which a reported duration belongs to the current cue
const FRESH_CUE_SECONDS: f64 = 1.0;

/// The IFrame SDK and the player it constructs
pub trait YoutubeBackend: Send + 'static {
    /// The SDK script has loaded and `YT.Player` can be constructed
    fn is_sdk_loaded(&self) -> bool;
    fn create_player(&mut self, options: &YoutubePlayerOptions);
    /// The constructed player exposes `cueVideoById`
    fn can_cue(&self) -> bool;
    /// `None` while the player has no defined state yet
    fn state(&self) -> Option<PlayerState>;
    fn cue(&mut self, video_id: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek_to(&mut self, seconds: f64);
    fn set_muted(&mut self, muted: bool);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn set_displayed(&mut self, displayed: bool);
    /// The `<video>` inside the player iframe
    fn video_element(&self) -> Option<ElementRef>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YoutubeSignal {
    /// Global `onYouTubeIframeAPIReady` fired
    SdkLoaded,
    PlayerReady,
    StateChange,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YoutubePlayerVars {
    pub autoplay: u8,
    pub muted: u8,
    pub controls: u8,
    pub playsinline: u8,
    pub showinfo: u8,
    pub rel: u8,
    pub cc_load_policy: u8,
    pub iv_load_policy: u8,
    pub modestbranding: u8,
}

impl Default for YoutubePlayerVars {
    fn default() -> Self {
        Self {
            autoplay: 0,
            muted: 1,
            controls: 0,
            playsinline: 1,
            showinfo: 0,
            rel: 0,
            cc_load_policy: 3,
            iv_load_policy: 3,
            modestbranding: 1,
        }
    }
}

/// Options for `new YT.Player(...)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubePlayerOptions {
    pub width: String,
    pub height: String,
    pub host: String,
    pub player_vars: YoutubePlayerVars,
    pub preload: bool,
}

impl Default for YoutubePlayerOptions {
    fn default() -> Self {
        Self {
            width: "100%".to_string(),
            height: "100%".to_string(),
            host: "https://www.youtube-nocookie.com".to_string(),
            player_vars: YoutubePlayerVars::default(),
            preload: true,
        }
    }
}

impl YoutubePlayerOptions {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YoutubeConfig {
    pub options: YoutubePlayerOptions,
    pub timings: ControllerTimings,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            options: YoutubePlayerOptions::default(),
            timings: SETTINGS.timings(),
        }
    }
}

struct YoutubeInner<B> {
    state: ControllerState,
    backend: B,
    config: YoutubeConfig,
    this: Weak<Mutex<YoutubeInner<B>>>,
    ready_tx: watch::Sender<bool>,
    player_created: bool,
    ready: bool,
    readiness: Option<TimerHandle>,
    play_retry: Option<TimerHandle>,
    pause_seeked: Option<TimerHandle>,
}

impl<B: YoutubeBackend> YoutubeInner<B> {
    fn active(&self) -> bool {
        self.player_created && self.state.source.is_some()
    }

    fn player_state(&self) -> PlayerState {
        self.backend.state().unwrap_or(PlayerState::Unknown)
    }

    /// Move through the two readiness gates. Returns true once both passed.
    fn advance_readiness(&mut self) -> bool {
        if !self.player_created && self.backend.is_sdk_loaded() {
            debug!(controller = YOUTUBE_KEY, "sdk loaded, creating player");
            self.backend.create_player(&self.config.options);
            self.player_created = true;
        }

        if self.player_created && !self.ready && self.backend.can_cue() {
            debug!(controller = YOUTUBE_KEY, "player ready");
            self.ready = true;
            self.ready_tx.send_replace(true);
            clear(&mut self.readiness);

            if let Some(source) = self.state.source.clone() {
                self.backend.cue(&source);
            }
        }

        self.ready
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

    fn dispatch(&mut self, signal: YoutubeSignal) {
        trace!(controller = YOUTUBE_KEY, ?signal, "sdk signal");
        match signal {
            YoutubeSignal::SdkLoaded => {
                self.advance_readiness();
            }
            YoutubeSignal::PlayerReady => {
                self.advance_readiness();
                if let Some(element) = self.backend.video_element() {
                    self.state.hook(&element);
                }
            }
            YoutubeSignal::StateChange => self.state_change(),
            YoutubeSignal::Error => {
                self.state.report(ControllerError::YoutubeError);

                let state = self.player_state();
                if state.is_finished() && self.state.playing {
                    self.state.manager.controller_ended(YOUTUBE_KEY);
                }
                self.stop();
            }
        }
    }

    fn state_change(&mut self) {
        let state = self.player_state();
        trace!(controller = YOUTUBE_KEY, state = state.as_str(), "state change");

        if state.is_finished() && self.state.playing {
            self.state.manager.controller_ended(YOUTUBE_KEY);
        }

        self.state.playing = state == PlayerState::Playing;
        if self.state.playing {
            self.state.stopped = false;
            self.state.pending.play = false;
        }

        if state == PlayerState::Playing && self.state.pending.pause {
            self.pause();
        }

        if state.is_seekable() && self.state.pending.take_stop() {
            // The player reports again once stopVideo lands
            self.stop();
            return;
        }

        self.backend.set_displayed(state.is_visible() && self.state.showing);

        if state.is_seekable() {
            if let Some(time) = self.state.pending.seek.take() {
                self.seek(time);
            }
        }

        if self.state.hooked() && state.is_finished() {
            self.state.unhook();
        } else if state.is_active() && !self.state.hooked() && !self.hook() {
            return;
        }

        if state == PlayerState::Playing {
            if self.state.duration.is_none() && self.backend.current_time() < FRESH_CUE_SECONDS {
                self.state.capture_duration(reported_duration(self.backend.duration()));
            }
            self.state.seeked();
        }
    }

    fn play(&mut self, muted: bool) {
        if !self.active() {
            return;
        }

        self.state.pending.stop = false;
        self.state.pending.pause = false;
        self.state.pending.play = true;
        self.state.stopped = false;

        self.backend.set_muted(muted || self.state.pending.seek.is_some());

        // The player drops commands issued before it reports a state
        clear(&mut self.play_retry);
        self.play_retry = Some(spawn_interval(
            self.this.clone(),
            self.config.timings.play_retry_interval,
            |inner: &mut YoutubeInner<B>| {
                if inner.backend.state().is_none() {
                    return ControlFlow::Continue(());
                }
                if std::mem::take(&mut inner.state.pending.play) {
                    inner.backend.play();
                }
                ControlFlow::Break(())
            },
        ));
    }

    fn pause(&mut self) {
        if !self.active() {
            return;
        }

        self.state.pending.play = false;
        clear(&mut self.play_retry);

        if self.player_state() == PlayerState::Playing {
            self.state.pending.pause = false;
            self.backend.pause();
        } else {
            self.state.pending.pause = true;
        }
    }

    fn stop(&mut self) {
        if !self.active() {
            return;
        }

        debug!(controller = YOUTUBE_KEY, "stopping");
        self.state.duration = None;
        self.state.pending.seek = None;
        self.state.pending.pause = false;
        self.state.pending.play = false;
        self.state.seeked();

        clear(&mut self.play_retry);
        clear(&mut self.pause_seeked);

        self.state.stopped = true;
        self.state.playing = false;
        self.state.unhook();

        if self.player_state().is_seekable() {
            self.state.pending.stop = false;
            self.backend.stop();
        } else {
            self.state.pending.stop = true;
        }
    }

    fn seek(&mut self, time: f64) {
        if !self.active() {
            return;
        }

        if !self.player_state().is_seekable() {
            self.state.pending.seek = Some(time);
            return;
        }

        self.state.pending.seek = None;
        self.backend.seek_to(time);
        self.backend.set_muted(false);

        // Seeking while paused produces no further state change
        clear(&mut self.pause_seeked);
        self.pause_seeked = Some(spawn_timeout(
            self.this.clone(),
            self.config.timings.pause_seeked_timeout,
            |inner: &mut YoutubeInner<B>| {
                if !inner.state.playing {
                    inner.state.seeked();
                }
            },
        ));
    }

    fn set(&mut self, source: Option<&str>) {
        if source == self.state.source.as_deref() {
            return;
        }

        let Some(source) = source else {
            self.stop();
            self.state.source = None;
            return;
        };

        debug!(controller = YOUTUBE_KEY, source, "cueing video");
        self.state.source = Some(source.to_string());
        self.state.duration = None;
        self.state.pending.clear();
        clear(&mut self.play_retry);
        clear(&mut self.pause_seeked);

        if self.ready {
            self.backend.cue(source);
        }
        self.state.seeked();
    }

    fn time(&self) -> f64 {
        if !self.active() {
            return 0.0;
        }
        self.backend.current_time()
    }

    fn screenshot(&self) -> Option<Screenshot> {
        if !self.state.playing || !self.active() {
            return None;
        }
        Screenshot::capture(&self.state.element()?)
    }

    fn show(&mut self) {
        self.state.showing = true;
        if self.player_created && self.player_state().is_visible() {
            self.backend.set_displayed(true);
        }
    }

    fn hide(&mut self) {
        self.state.showing = false;
        self.backend.set_displayed(false);
    }
}

/// Video-hosting controller. Clones share the same state.
pub struct YoutubeController<B> {
    inner: Arc<Mutex<YoutubeInner<B>>>,
    ready: ReadySignal,
}

impl<B> Clone for YoutubeController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ready: self.ready.clone(),
        }
    }
}

impl<B: YoutubeBackend> YoutubeController<B> {
    pub fn new(manager: Manager, backend: B) -> Self {
        Self::with_config(manager, backend, YoutubeConfig::default())
    }

    /// Must be called inside a tokio runtime. The player is created as soon
    /// as the SDK is present; readiness resolves once it can cue videos.
    pub fn with_config(manager: Manager, mut backend: B, config: YoutubeConfig) -> Self {
        backend.set_displayed(false);

        let (ready_tx, ready) = ReadySignal::channel();
        let poll_interval = config.timings.sdk_poll_interval;

        let inner = Arc::new_cyclic(|this| {
            Mutex::new(YoutubeInner {
                state: ControllerState::new(YOUTUBE_KEY, manager),
                backend,
                config,
                this: this.clone(),
                ready_tx,
                player_created: false,
                ready: false,
                readiness: None,
                play_retry: None,
                pause_seeked: None,
            })
        });

        {
            let mut guard = lock(&inner);
            if !guard.advance_readiness() {
                guard.readiness = Some(spawn_interval(
                    Arc::downgrade(&inner),
                    poll_interval,
                    |inner: &mut YoutubeInner<B>| {
                        if inner.advance_readiness() {
                            ControlFlow::Break(())
                        } else {
                            ControlFlow::Continue(())
                        }
                    },
                ));
            }
        }

        Self { inner, ready }
    }

    /// Feed an SDK event into the state machine
    pub fn dispatch(&self, signal: YoutubeSignal) {
        lock(&self.inner).dispatch(signal);
    }

    /// Run `f` against the backend, e.g. to inspect a test double
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut lock(&self.inner).backend)
    }
}

impl<B: YoutubeBackend> Controller for YoutubeController<B> {
    fn key(&self) -> &'static str {
        YOUTUBE_KEY
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
