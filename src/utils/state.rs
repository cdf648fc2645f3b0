/// Player states reported by the YouTube IFrame SDK
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    /// Nothing started yet, or the player was reset (-1)
    Unstarted,
    /// Video has ended (0)
    Ended,
    /// Video is currently playing (1)
    Playing,
    /// Video is paused (2)
    Paused,
    /// Video is buffering (3)
    Buffering,
    /// Video is cued and waiting for play (5)
    Cued,
    /// Unknown state
    Unknown,
}

impl PlayerState {
    /// Convert from integer state to enum value
    pub fn from_i32(state: i32) -> Self {
        match state {
            -1 => PlayerState::Unstarted,
            0 => PlayerState::Ended,
            1 => PlayerState::Playing,
            2 => PlayerState::Paused,
            3 => PlayerState::Buffering,
            5 => PlayerState::Cued,
            _ => PlayerState::Unknown,
        }
    }

    /// Convert to integer representation
    pub fn to_i32(self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
            PlayerState::Unknown => -99, // Special value for unknown state
        }
    }

    /// Get string representation of the state
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::Unstarted => "UNSTARTED",
            PlayerState::Ended => "ENDED",
            PlayerState::Playing => "PLAYING",
            PlayerState::Paused => "PAUSED",
            PlayerState::Buffering => "BUFFERING",
            PlayerState::Cued => "CUED",
            PlayerState::Unknown => "UNKNOWN",
        }
    }

    /// Ended or reset; the media element may be gone.
    pub fn is_finished(self) -> bool {
        matches!(self, PlayerState::Ended | PlayerState::Unstarted)
    }

    /// States in which `seekTo` and `stopVideo` are honoured.
    pub fn is_seekable(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }

    /// States in which the player surface should be displayed.
    pub fn is_visible(self) -> bool {
        matches!(
            self,
            PlayerState::Playing | PlayerState::Paused | PlayerState::Buffering
        )
    }

    /// States in which a media element is expected to exist.
    pub fn is_active(self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Buffering)
    }
}
