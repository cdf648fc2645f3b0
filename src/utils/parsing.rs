use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ControllerError;
use crate::media::MediaDuration;

lazy_static! {
    static ref TAGGED_SOURCE_RE: Regex = Regex::new(r"^(channel|video):(\S+)$").unwrap();
}

/// Content a livestream controller can tune to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwitchSource {
    Channel(String),
    Video(String),
}

impl TwitchSource {
    /// Parse a `channel:<name>` or `video:<id>` source string
    pub fn parse(source: &str) -> Result<Self, ControllerError> {
        let captures = TAGGED_SOURCE_RE
            .captures(source.trim())
            .ok_or_else(|| ControllerError::InvalidSource(source.to_string()))?;

        let value = captures[2].to_string();
        match &captures[1] {
            "channel" => Ok(TwitchSource::Channel(value)),
            _ => Ok(TwitchSource::Video(value)),
        }
    }

    /// Channel name, if this source is a live channel
    pub fn channel(&self) -> Option<&str> {
        match self {
            TwitchSource::Channel(name) => Some(name),
            TwitchSource::Video(_) => None,
        }
    }
}

/// Normalise a duration reported by a backend.
///
/// Zero, NaN and infinite values all mean the content has no fixed end.
pub fn reported_duration(seconds: f64) -> MediaDuration {
    if seconds.is_finite() && seconds > 0.0 {
        MediaDuration::Finite(seconds)
    } else {
        MediaDuration::Live
    }
}

/// Duration as the livestream embed reports it.
///
/// Only an infinite value marks a live stream. Zero and NaN mean the length
/// is not known yet and yield `None`.
pub fn stream_duration(seconds: f64) -> Option<MediaDuration> {
    if seconds == f64::INFINITY {
        Some(MediaDuration::Live)
    } else if seconds.is_finite() && seconds > 0.0 {
        Some(MediaDuration::Finite(seconds))
    } else {
        None
    }
}

/// True if a declared `<source type>` describes video content
pub fn is_video_mime(mime: &str) -> bool {
    mime.trim_start().starts_with("video/")
}
