use std::time::Duration;

/// Everything that can go wrong while measuring a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    /// Transport-level failure: DNS, refused connection, TLS, broken body.
    CommunicationFailure { url: String, message: String },
    /// No response within the per-call deadline.
    Timeout { url: String, timeout: Duration },
    /// The player answered with something other than 200.
    UnexpectedStatus { status: u16, body: String },
    /// The player's shot answer was empty, malformed, or the wrong size.
    InvalidShot { shot: Option<String>, reason: String },
    /// A game did not finish within the round bound.
    RoundLimitExceeded { rounds: u32 },
    /// Another tournament already holds the player's lease.
    LeaseConflict { player_id: String },
    /// The lease token is no longer valid for the player.
    LeaseExpired { player_id: String },
    /// A request body could not be encoded; nothing was sent.
    Encoding(String),
    Storage(String),
    QueueClosed,
}

impl ArenaError {
    pub fn invalid_shot(shot: Option<&str>, reason: impl Into<String>) -> Self {
        Self::InvalidShot {
            shot: shot.map(str::to_string),
            reason: reason.into(),
        }
    }

    pub fn is_lease_error(&self) -> bool {
        matches!(self, Self::LeaseConflict { .. } | Self::LeaseExpired { .. })
    }
}

impl std::fmt::Display for ArenaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CommunicationFailure { url, message } => {
                write!(f, "communication with {url} failed: {message}")
            },
            Self::Timeout { url, timeout } => {
                write!(f, "{url} did not answer within {}ms", timeout.as_millis())
            },
            Self::UnexpectedStatus { status, body } => {
                write!(f, "player answered with status {status}: {body}")
            },
            Self::InvalidShot {
                shot: Some(shot),
                reason,
            } => write!(f, "invalid shot {shot:?}: {reason}"),
            Self::InvalidShot { shot: None, reason } => write!(f, "invalid shot: {reason}"),
            Self::RoundLimitExceeded { rounds } => {
                write!(f, "game did not finish within {rounds} rounds")
            },
            Self::LeaseConflict { player_id } => {
                write!(f, "player {player_id} is already being measured")
            },
            Self::LeaseExpired { player_id } => {
                write!(f, "lease for player {player_id} is no longer valid")
            },
            Self::Encoding(m) => write!(f, "failed to encode request: {m}"),
            Self::Storage(m) => write!(f, "storage error: {m}"),
            Self::QueueClosed => write!(f, "tournament queue is closed"),
        }
    }
}

impl std::error::Error for ArenaError {}
