//! Controller for media found inside an embedded foreign webpage.
//!
//! The page is loaded in an invisible sandboxed frame. Once it has loaded,
//! the controller scans its document for the first video (or failing that,
//! audio) element, silences every other candidate and binds to it.

use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

use super::{Controller, ControllerState, ControllerStatus, ReadySignal};
use crate::error::ControllerError;
use crate::manager::Manager;
use crate::media::{ElementId, ElementKind, ElementRef, Screenshot};
use crate::utils::lock;
use crate::utils::parsing::{is_video_mime, reported_duration};

pub const FRAME_KEY: &str = "frame";

const BLANK_PAGE: &str = "about:blank";

/// The sandboxed frame hosting the foreign page
pub trait FrameBackend: Send + 'static {
    /// Point the frame at `url`; a `Loaded` signal follows once it settles
    fn navigate(&mut self, url: &str);
    fn set_opacity(&mut self, opacity: f32);
    /// Hide the loaded page's scrollbars
    fn lock_scroll(&mut self);
    fn videos(&self) -> Vec<ElementRef>;
    fn audios(&self) -> Vec<ElementRef>;
}

/// Events raised by a bound media element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementSignal {
    Error,
    Playing,
    LoadedData,
    DurationChange,
    Seeked,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSignal {
    /// The frame finished loading its current document
    Loaded,
    /// The frame itself failed to load
    LoadFailed,
    Element(ElementId, ElementSignal),
}

/// Chosen element is video unless it declares sources and none of them is video
fn detect_video(element: &ElementRef) -> bool {
    if element.kind() == ElementKind::Audio {
        return false;
    }

    let types = element.source_types();
    types.is_empty() || types.iter().any(|mime| is_video_mime(mime))
}

struct FrameInner<B> {
    state: ControllerState,
    backend: B,
    video: bool,
}

impl<B: FrameBackend> FrameInner<B> {
    fn has_source(&self) -> bool {
        self.state.source.is_some()
    }

    fn hook(&mut self) {
        self.backend.lock_scroll();

        let videos = self.backend.videos();
        let audios = self.backend.audios();
        for element in videos.iter().chain(audios.iter()) {
            element.set_muted(true);
            element.pause();
        }

        let chosen = match videos.first() {
            Some(element) => Some((element.clone(), detect_video(element))),
            None => audios.first().map(|element| (element.clone(), false)),
        };

        let Some((element, video)) = chosen else {
            self.state.report(ControllerError::SourceNotFound);
            self.video = false;
            self.state.unhook();
            self.stop();
            return;
        };

        self.video = video;
        if self.state.binding.is_new(&element) {
            element.prepare();
            element.pause();
        }
        self.state.hook(&element);
        self.state.pending.play = false;

        if let Err(e) = element.play() {
            trace!(controller = FRAME_KEY, "autoplay after hook refused: {}", e);
        }
    }

    /// The bound element, or `None` after reporting it lost if the page dropped it
    fn live_element(&mut self) -> Option<ElementRef> {
        self.state.binding.bound()?;
        match self.state.element() {
            Some(element) => Some(element),
            None => {
                debug!(controller = FRAME_KEY, "bound element disappeared from page");
                self.state.report(ControllerError::SourceNotFound);
                self.state.unhook();
                self.stop();
                None
            }
        }
    }

    fn dispatch(&mut self, signal: FrameSignal) {
        trace!(controller = FRAME_KEY, ?signal, "frame signal");
        match signal {
            FrameSignal::Loaded => {
                if self.has_source() && !self.state.stopped {
                    self.hook();
                }
            }
            FrameSignal::LoadFailed => {
                self.state.report(ControllerError::SourceError);
                self.stop();
            }
            FrameSignal::Element(id, signal) => {
                if !self.state.binding.is_bound_to(id) {
                    trace!(controller = FRAME_KEY, element = %id, ?signal, "ignoring signal from unbound element");
                    return;
                }
                self.element_signal(signal);
            }
        }
    }

    fn element_signal(&mut self, signal: ElementSignal) {
        let Some(element) = self.live_element() else {
            return;
        };

        match signal {
            ElementSignal::Error => {
                self.state.report(ControllerError::SourceError);
                self.backend.set_opacity(0.0);
                if element.is_ended() && self.state.playing {
                    self.state.playing = false;
                    self.state.manager.controller_ended(FRAME_KEY);
                }
                if element.is_paused() {
                    self.state.playing = false;
                }
                self.stop();
            }
            ElementSignal::Playing => {
                if self.state.playing {
                    return;
                }

                self.state.manager.hide_spinner();
                if self.video && self.state.showing {
                    self.backend.set_opacity(1.0);
                }

                element.set_muted(false);
                self.state.playing = true;
                self.state.pending.play = false;

                if self.state.pending.take_pause() {
                    self.pause();
                }
                if let Some(time) = self.state.pending.seek.take() {
                    self.seek(time);
                }

                let raw = element.duration();
                if raw != 0.0 && !raw.is_nan() {
                    self.state.capture_duration(reported_duration(raw));
                }
            }
            ElementSignal::LoadedData | ElementSignal::DurationChange => {
                self.state.capture_duration(reported_duration(element.duration()));
            }
            ElementSignal::Seeked => self.state.seeked(),
            ElementSignal::Ended => self.stop(),
        }
    }

    fn play(&mut self, muted: bool) {
        let Some(source) = self.state.source.clone() else {
            return;
        };

        self.state.manager.show_spinner();

        if self.state.stopped {
            self.state.stopped = false;
            self.backend.navigate(&source);
        }

        if self.state.hooked() {
            let Some(element) = self.live_element() else {
                return;
            };
            self.state.pending.play = false;
            self.state.pending.pause = false;
            element.set_muted(muted || self.state.pending.seek.is_some());
            if let Err(e) = element.play() {
                trace!(controller = FRAME_KEY, "play refused: {}", e);
            }
        } else {
            self.state.pending.pause = false;
            self.state.pending.play = true;
        }
    }

    fn pause(&mut self) {
        if !self.has_source() {
            return;
        }

        self.state.pending.play = false;
        if self.state.playing {
            if let Some(element) = self.state.element() {
                element.pause();
            }
            self.state.pending.pause = false;
            self.state.playing = false;
        } else {
            self.state.pending.pause = true;
        }
    }

    /// Rewind and silence the bound element if it is playing
    fn halt_element(&mut self) -> bool {
        if !self.state.playing {
            return false;
        }
        if let Some(element) = self.state.element() {
            element.pause();
            element.set_current_time(0.0);
        }
        self.state.playing = false;
        true
    }

    fn stop(&mut self) {
        if !self.has_source() {
            return;
        }

        debug!(controller = FRAME_KEY, "stopping");
        self.state.duration = None;
        self.backend.set_opacity(0.0);
        self.state.manager.hide_spinner();
        self.state.seeked();

        self.state.stopped = true;
        if self.halt_element() {
            self.state.manager.controller_ended(FRAME_KEY);
        }

        self.state.pending.clear();
        self.video = false;
        self.state.unhook();
        self.backend.navigate(BLANK_PAGE);
    }

    fn seek(&mut self, time: f64) {
        if !self.has_source() {
            return;
        }

        match self.state.element() {
            Some(element) => {
                self.state.pending.seek = None;
                element.set_current_time(time);
                element.set_muted(false);
            }
            None => self.state.pending.seek = Some(time),
        }
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

        debug!(controller = FRAME_KEY, source, "loading page");
        self.backend.set_opacity(0.0);
        self.halt_element();
        self.state.stopped = true;
        self.state.source = Some(source.to_string());
        self.state.duration = None;
        self.state.pending.clear();
        self.video = false;
        self.state.unhook();
        self.backend.navigate(source);
        self.state.manager.hide_spinner();
        self.state.seeked();
    }

    fn time(&self) -> f64 {
        if !self.has_source() {
            return 0.0;
        }
        self.state
            .element()
            .map(|element| element.current_time())
            .unwrap_or(0.0)
    }

    fn screenshot(&self) -> Option<Screenshot> {
        if !self.state.playing || !self.has_source() || !self.video {
            return None;
        }
        Screenshot::capture(&self.state.element()?)
    }

    fn show(&mut self) {
        self.state.showing = true;
        if self.video {
            self.backend.set_opacity(1.0);
        }
    }

    fn hide(&mut self) {
        self.state.showing = false;
        self.backend.set_opacity(0.0);
    }
}

/// Embedded-page controller. Clones share the same state.
pub struct FrameController<B> {
    inner: Arc<Mutex<FrameInner<B>>>,
    ready: ReadySignal,
}

impl<B> Clone for FrameController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            ready: self.ready.clone(),
        }
    }
}

impl<B: FrameBackend> FrameController<B> {
    /// Create the controller around a fresh, blank frame.
    ///
    /// Must be called inside a tokio runtime; readiness is signalled on the
    /// next scheduling turn.
    pub fn new(manager: Manager, mut backend: B) -> Self {
        backend.set_opacity(0.0);
        backend.navigate(BLANK_PAGE);

        let inner = FrameInner {
            state: ControllerState::new(FRAME_KEY, manager),
            backend,
            video: false,
        };

        let (ready_tx, ready) = ReadySignal::channel();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            ready_tx.send_replace(true);
        });

        Self {
            inner: Arc::new(Mutex::new(inner)),
            ready,
        }
    }

    /// Feed a frame or element event into the state machine
    pub fn dispatch(&self, signal: FrameSignal) {
        lock(&self.inner).dispatch(signal);
    }

    /// Run `f` against the backend, e.g. to inspect a test double
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut lock(&self.inner).backend)
    }
}

impl<B: FrameBackend> Controller for FrameController<B> {
    fn key(&self) -> &'static str {
        FRAME_KEY
    }

    fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    fn status(&self) -> ControllerStatus {
        let inner = lock(&self.inner);
        inner.state.status(inner.video)
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
        lock(&self.inner).video
    }

    fn show(&self) {
        lock(&self.inner).show();
    }

    fn hide(&self) {
        lock(&self.inner).hide();
    }
}
