// Scripted backends shared by the controller integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use embed_controllers::{
    AudioContext, AudioTap, ControllerEvent, ElementId, ElementKind, ElementRef, FrameBackend,
    Manager, MediaElement, PlayRejected, PlayerState, TwitchBackend, YoutubeBackend,
    YoutubePlayerOptions,
};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Media elements and audio graph
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ElementState {
    pub muted: bool,
    pub paused: bool,
    pub ended: bool,
    pub current_time: f64,
    pub duration: f64,
    pub size: (i32, i32),
    pub play_calls: usize,
    pub reject_play: bool,
    pub prepared: bool,
}

pub struct FakeElement {
    id: ElementId,
    kind: ElementKind,
    source_types: Vec<String>,
    pub state: Mutex<ElementState>,
}

impl FakeElement {
    pub fn video(id: u64) -> Arc<Self> {
        Self::with_sources(id, ElementKind::Video, &[])
    }

    pub fn audio(id: u64) -> Arc<Self> {
        Self::with_sources(id, ElementKind::Audio, &[])
    }

    pub fn with_sources(id: u64, kind: ElementKind, sources: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            id: ElementId(id),
            kind,
            source_types: sources.iter().map(|s| s.to_string()).collect(),
            state: Mutex::new(ElementState {
                paused: true,
                duration: f64::NAN,
                ..ElementState::default()
            }),
        })
    }

    pub fn handle(self: &Arc<Self>) -> ElementRef {
        self.clone()
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, ElementState> {
        self.state.lock().unwrap()
    }
}

impl MediaElement for FakeElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn kind(&self) -> ElementKind {
        self.kind
    }

    fn source_types(&self) -> Vec<String> {
        self.source_types.clone()
    }

    fn prepare(&self) {
        self.state().prepared = true;
    }

    fn play(&self) -> Result<(), PlayRejected> {
        let mut state = self.state();
        state.play_calls += 1;
        if state.reject_play {
            return Err(PlayRejected("NotAllowedError".to_string()));
        }
        state.paused = false;
        Ok(())
    }

    fn pause(&self) {
        self.state().paused = true;
    }

    fn set_muted(&self, muted: bool) {
        self.state().muted = muted;
    }

    fn current_time(&self) -> f64 {
        self.state().current_time
    }

    fn set_current_time(&self, seconds: f64) {
        self.state().current_time = seconds;
    }

    fn duration(&self) -> f64 {
        self.state().duration
    }

    fn is_ended(&self) -> bool {
        self.state().ended
    }

    fn is_paused(&self) -> bool {
        self.state().paused
    }

    fn rendered_size(&self) -> (i32, i32) {
        self.state().size
    }

    fn capture_frame(&self, width: u32, height: u32) -> Option<Vec<u8>> {
        Some(vec![0x7f; (width * height * 4) as usize])
    }
}

#[derive(Default)]
pub struct FakeAudio {
    pub created: AtomicUsize,
    pub disconnected: Arc<AtomicUsize>,
}

impl FakeAudio {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn disconnected(&self) -> usize {
        self.disconnected.load(Ordering::SeqCst)
    }
}

struct FakeTap {
    disconnected: Arc<AtomicUsize>,
}

impl AudioTap for FakeTap {
    fn disconnect(&mut self) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

impl AudioContext for FakeAudio {
    fn create_media_source(&self, _element: &ElementRef) -> Box<dyn AudioTap> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Box::new(FakeTap {
            disconnected: self.disconnected.clone(),
        })
    }
}

pub fn manager() -> (Manager, Arc<FakeAudio>, broadcast::Receiver<ControllerEvent>) {
    let audio = Arc::new(FakeAudio::default());
    let manager = Manager::with_capacity(audio.clone(), 256);
    let events = manager.subscribe();
    (manager, audio, events)
}

/// Everything received so far, without waiting
pub fn drain(events: &mut broadcast::Receiver<ControllerEvent>) -> Vec<ControllerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

pub fn errors(events: &[ControllerEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|event| event.error().map(|error| error.code()))
        .collect()
}

pub fn count(events: &[ControllerEvent], event_type: &str) -> usize {
    events
        .iter()
        .filter(|event| event.event_type() == event_type)
        .count()
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFrame {
    pub navigations: Vec<String>,
    pub opacity: f32,
    pub scroll_locked: bool,
    pub videos: Vec<ElementRef>,
    pub audios: Vec<ElementRef>,
}

impl FakeFrame {
    pub fn last_url(&self) -> Option<&str> {
        self.navigations.last().map(String::as_str)
    }
}

impl FrameBackend for FakeFrame {
    fn navigate(&mut self, url: &str) {
        self.navigations.push(url.to_string());
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    fn lock_scroll(&mut self) {
        self.scroll_locked = true;
    }

    fn videos(&self) -> Vec<ElementRef> {
        self.videos.clone()
    }

    fn audios(&self) -> Vec<ElementRef> {
        self.audios.clone()
    }
}

#[derive(Default)]
pub struct FakeTwitch {
    pub queryable: bool,
    pub channel: Option<String>,
    pub video: Option<String>,
    pub tunes: Vec<String>,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub seeks: Vec<f64>,
    pub muted: bool,
    pub current_time: f64,
    pub duration: f64,
    pub opacity: f32,
    pub element: Option<ElementRef>,
    pub gate_overlay: bool,
    pub muted_alert: bool,
    pub mature_warning: bool,
}

impl TwitchBackend for FakeTwitch {
    fn is_queryable(&self) -> bool {
        self.queryable
    }

    fn set_channel(&mut self, channel: &str) {
        self.tunes.push(format!("channel:{channel}"));
        self.channel = Some(channel.to_string());
        self.video = None;
    }

    fn set_video(&mut self, video: &str) {
        self.tunes.push(format!("video:{video}"));
        self.video = Some(video.to_string());
        self.channel = None;
    }

    fn channel(&self) -> Option<String> {
        self.channel.clone()
    }

    fn play(&mut self) {
        self.play_calls += 1;
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
    }

    fn seek(&mut self, time: f64) {
        self.seeks.push(time);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity;
    }

    fn video_element(&self) -> Option<ElementRef> {
        self.element.clone()
    }

    fn has_gate_overlay(&self) -> bool {
        self.gate_overlay
    }

    fn dismiss_muted_segments_alert(&mut self) -> bool {
        std::mem::take(&mut self.muted_alert)
    }

    fn accept_mature_content(&mut self) -> bool {
        std::mem::take(&mut self.mature_warning)
    }
}

#[derive(Default)]
pub struct FakeYoutube {
    pub sdk_loaded: bool,
    pub created_with: Option<YoutubePlayerOptions>,
    pub cueable: bool,
    pub state: Option<PlayerState>,
    pub cued: Vec<String>,
    pub play_calls: usize,
    pub pause_calls: usize,
    pub stop_calls: usize,
    pub seeks: Vec<f64>,
    pub muted: bool,
    pub current_time: f64,
    pub duration: f64,
    pub displayed: bool,
    pub element: Option<ElementRef>,
}

impl FakeYoutube {
    /// SDK present and player immediately usable
    pub fn loaded() -> Self {
        Self {
            sdk_loaded: true,
            cueable: true,
            ..Self::default()
        }
    }
}

impl YoutubeBackend for FakeYoutube {
    fn is_sdk_loaded(&self) -> bool {
        self.sdk_loaded
    }

    fn create_player(&mut self, options: &YoutubePlayerOptions) {
        self.created_with = Some(options.clone());
    }

    fn can_cue(&self) -> bool {
        self.created_with.is_some() && self.cueable
    }

    fn state(&self) -> Option<PlayerState> {
        self.state
    }

    fn cue(&mut self, video_id: &str) {
        self.cued.push(video_id.to_string());
    }

    fn play(&mut self) {
        self.play_calls += 1;
    }

    fn pause(&mut self) {
        self.pause_calls += 1;
    }

    fn stop(&mut self) {
        self.stop_calls += 1;
    }

    fn seek_to(&mut self, seconds: f64) {
        self.seeks.push(seconds);
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn current_time(&self) -> f64 {
        self.current_time
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn set_displayed(&mut self, displayed: bool) {
        self.displayed = displayed;
    }

    fn video_element(&self) -> Option<ElementRef> {
        self.element.clone()
    }
}
