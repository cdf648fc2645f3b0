//! Uniform playback controllers over asynchronous third-party media backends.
//!
//! Three backends are covered: a foreign webpage loaded in a sandboxed
//! frame ([`FrameController`]), the Twitch embed SDK ([`TwitchController`])
//! and the YouTube IFrame SDK ([`YoutubeController`]). Each one reconciles
//! commands from the [`Manager`] with backend readiness that arrives late
//! and out of order, binds to the backend's real media element when one
//! shows up, and reports lifecycle callbacks as [`ControllerEvent`]s.
//!
//! # Logging
//!
//! This library uses the `tracing` crate for logging. To enable logs, you'll need to
//! initialize a tracing subscriber in your application.
//!
//! Example using `tracing_subscriber`:
//! ```no_run
//! use tracing::Level;
//! use tracing_subscriber::FmtSubscriber;
//!
//! let subscriber = FmtSubscriber::builder()
//!     .with_max_level(Level::DEBUG)
//!     .finish();
//!
//! tracing::subscriber::set_global_default(subscriber)
//!     .expect("Failed to set tracing subscriber");
//! ```
//!
//! - `TRACE`: raw backend signals, polls and ignored stale events
//! - `DEBUG`: commands, readiness and duration capture
//! - `INFO`: element hook/unhook
//! - `WARN`: errors reported to the manager and resync requests

pub mod controller;
pub use controller::frame::{ElementSignal, FrameBackend, FrameController, FrameSignal, FRAME_KEY};
pub use controller::twitch::{
    TwitchBackend, TwitchConfig, TwitchController, TwitchEmbedOptions, TwitchSignal, TWITCH_KEY,
};
pub use controller::youtube::{
    YoutubeBackend, YoutubeConfig, YoutubeController, YoutubePlayerOptions, YoutubePlayerVars,
    YoutubeSignal, YOUTUBE_KEY,
};
pub use controller::{Controller, ControllerStatus, Pending, ReadySignal};
mod error;
pub use error::ControllerError;
mod events;
pub use events::ControllerEvent;
mod manager;
pub use manager::Manager;
pub mod media;
pub use media::{
    AudioContext, AudioTap, BoundElement, ElementId, ElementKind, ElementRef, MediaDuration,
    MediaElement, PlayRejected, Screenshot,
};
pub mod settings;
pub use settings::{ControllerTimings, Settings, SETTINGS};
mod timer;
mod utils;
pub use utils::parsing::TwitchSource;
pub use utils::state::PlayerState;
