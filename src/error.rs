use thiserror::Error;

// Error codes surfaced to the manager, plus parse failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Media source failed to load or play")]
    SourceError,

    #[error("No playable media element found in backend document")]
    SourceNotFound,

    #[error("Twitch VOD is restricted to subscribers or gated")]
    TwitchVodSubOnly,

    #[error("Twitch playback blocked")]
    TwitchPlaybackBlocked,

    #[error("Twitch channel offline")]
    TwitchChannelOffline,

    #[error("YouTube player error")]
    YoutubeError,

    #[error("Invalid source: {0}")]
    InvalidSource(String),
}

impl ControllerError {
    /// Stable error code reported to the manager.
    pub fn code(&self) -> &'static str {
        match self {
            ControllerError::SourceError => "E_SOURCE_ERROR",
            ControllerError::SourceNotFound => "E_SOURCE_NOT_FOUND",
            ControllerError::TwitchVodSubOnly => "E_TWITCH_VOD_SUB_ONLY",
            ControllerError::TwitchPlaybackBlocked => "E_TWITCH_PLAYBACK_BLOCKED",
            ControllerError::TwitchChannelOffline => "E_TWITCH_CHANNEL_OFFLINE",
            ControllerError::YoutubeError => "E_YOUTUBE_ERROR",
            ControllerError::InvalidSource(_) => "E_INVALID_SOURCE",
        }
    }

    /// Access-gated and source-unavailable errors come from the stream
    /// service itself rather than from the media element.
    pub fn is_remote_refusal(&self) -> bool {
        matches!(
            self,
            ControllerError::TwitchVodSubOnly
                | ControllerError::TwitchPlaybackBlocked
                | ControllerError::TwitchChannelOffline
        )
    }
}
